//! Build script for leaf-dashboard-simulator
//!
//! Sets up SDL2 library paths and copies SDL2.dll to the target directory.

use std::path::PathBuf;
use std::{env, fs};

fn main() {
    // Only run SDL2 setup on Windows
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }

    let Some(vendor_sdl2) = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().map(|root| root.join("vendor").join("sdl2")))
    else {
        return;
    };
    println!("cargo:rerun-if-changed={}", vendor_sdl2.display());

    if !vendor_sdl2.exists() {
        println!("cargo:warning=SDL2 vendor directory not found at {}", vendor_sdl2.display());
        println!("cargo:warning=Put SDL2.lib and SDL2.dll in vendor/sdl2/ or install SDL2 system-wide");
        return;
    }
    println!("cargo:rustc-link-search=native={}", vendor_sdl2.display());

    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out; the DLL goes next to the binary
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    let Some(target_dir) = out_dir
        .ancestors()
        .find(|p| p.file_name().is_some_and(|n| n == "release" || n == "debug"))
    else {
        return;
    };

    let dll_src = vendor_sdl2.join("SDL2.dll");
    let dll_dst = target_dir.join("SDL2.dll");
    if dll_src.exists() && !dll_dst.exists() {
        if let Err(e) = fs::copy(&dll_src, &dll_dst) {
            println!("cargo:warning=Failed to copy SDL2.dll: {e}");
        }
    }
}
