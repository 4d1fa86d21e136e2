//! Build script for daqmx-sys.
//!
//! Emits link directives for the NI-DAQmx runtime when the `daqmx-sdk`
//! feature is enabled. The declarations in `src/lib.rs` are hand-maintained,
//! so no bindings are generated here.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=NIDAQMX_LIB_DIR");

    if env::var_os("CARGO_FEATURE_DAQMX_SDK").is_none() {
        return;
    }

    if let Ok(dir) = env::var("NIDAQMX_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    } else {
        let lib_paths = [
            "C:\\Program Files (x86)\\National Instruments\\Shared\\ExternalCompilerSupport\\C\\lib64\\msvc",
            "/usr/lib/x86_64-linux-gnu",
            "/usr/local/lib",
            "/usr/lib",
        ];

        for path in lib_paths {
            let dir = Path::new(path);
            if dir.join("NIDAQmx.lib").exists() || dir.join("libnidaqmx.so").exists() {
                println!("cargo:rustc-link-search=native={}", path);
                break;
            }
        }
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        println!("cargo:rustc-link-lib=NIDAQmx");
    } else {
        println!("cargo:rustc-link-lib=nidaqmx");
    }
}
