use std::env;
use std::path::PathBuf;

fn main() {
    // Only run bindgen and linking logic if the `realsense-sdk` feature is enabled.
    // This allows the crate to compile without the SDK if the feature is not active.
    #[cfg(feature = "realsense-sdk")]
    {
        println!("cargo:rerun-if-env-changed=REALSENSE_SDK_DIR");
        println!("cargo:rerun-if-changed=wrapper.h"); // For bindgen to re-run if wrapper changes

        let sdk_dir = env::var("REALSENSE_SDK_DIR").expect(
            "REALSENSE_SDK_DIR environment variable must be set when `realsense-sdk` feature is enabled.",
        );

        let sdk_include_path = PathBuf::from(&sdk_dir).join("include");

        // Allow REALSENSE_LIB_DIR to override the default lib path
        let sdk_lib_path = if let Ok(lib_dir) = env::var("REALSENSE_LIB_DIR") {
            PathBuf::from(lib_dir)
        } else {
            PathBuf::from(&sdk_dir).join("lib")
        };

        if !sdk_include_path.exists() {
            panic!(
                "librealsense include path does not exist: {:?}",
                sdk_include_path
            );
        }
        // The lib path might not exist if libraries are installed globally,
        // but it's a common place. Warn rather than panic.
        if !sdk_lib_path.exists() {
            eprintln!(
                "Warning: librealsense lib path does not exist: {:?}",
                sdk_lib_path
            );
        }

        // Generate bindings
        let bindings = bindgen::Builder::default()
            // The input header we would like to generate bindings for.
            .header("wrapper.h")
            // Tell cargo to invalidate the built crate whenever any of the
            // included header files changed.
            .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
            // Add include path for librealsense headers
            .clang_arg(format!("-I{}", sdk_include_path.display()))
            // Allowlist functions starting with `rs_`
            .allowlist_function("rs_.*")
            // Opaque handle and value types of the C API. Bindgen pulls in
            // types reachable from allowlisted function signatures, but
            // explicit allowlisting is safer for constants and enums.
            .allowlist_type("rs_context|rs_device|rs_device_list")
            .allowlist_type("rs_streaming_lock|rs_frame|rs_frame_queue")
            .allowlist_type("rs_stream_modes_list|rs_error")
            .allowlist_type("rs_stream|rs_format|rs_subdevice|rs_option")
            .allowlist_type("rs_camera_info|rs_frame_metadata")
            .allowlist_type("rs_timestamp_domain|rs_distortion|rs_log_severity")
            .allowlist_type("rs_intrinsics|rs_extrinsics")
            .allowlist_var("RS_API_VERSION")
            .default_enum_style(bindgen::EnumVariation::Rust {
                non_exhaustive: false,
            })
            // Finish the builder and generate the bindings.
            .generate()
            .expect("Unable to generate bindings");

        // Write the bindings to the $OUT_DIR/bindings.rs file.
        let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
        bindings
            .write_to_file(out_path.join("bindings.rs"))
            .expect("Couldn't write bindings!");

        // Link to the librealsense library
        println!("cargo:rustc-link-search=native={}", sdk_lib_path.display());
        println!("cargo:rustc-link-lib=realsense");
    }
    #[cfg(not(feature = "realsense-sdk"))]
    {
        // If the realsense-sdk feature is not enabled, create a dummy bindings file
        // to allow src/lib.rs to compile without actual SDK presence.
        let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
        std::fs::write(
            out_path.join("bindings.rs"),
            "// Dummy bindings when realsense-sdk feature is not enabled\n",
        )
        .expect("Couldn't write dummy bindings!");
    }
}
