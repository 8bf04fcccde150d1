use std::env;
use std::path::PathBuf;

// FFmpeg itself is located by ffmpeg-sys-next. On Windows that discovery is
// fragile, so point the user at a vcpkg install when FFMPEG_DIR is unset.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=vidframes: set FFMPEG_DIR (or VCPKG_ROOT) so FFmpeg can be found on Windows.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.exists() {
        println!(
            "cargo:warning=vidframes: found FFmpeg under {}; set FFMPEG_DIR to that path to use it.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=vidframes: VCPKG_ROOT is set but {} does not exist.",
            candidate.display()
        );
    }
}
