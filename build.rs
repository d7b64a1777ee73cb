fn main() {
    println!("cargo:rerun-if-env-changed=CPASSWORDSDK_LIB_DIR");

    #[cfg(feature = "native")]
    {
        // The SDK installer drops libcpasswordsdk.so under /usr/lib by default;
        // anything else has to be pointed at explicitly.
        if let Ok(dir) = std::env::var("CPASSWORDSDK_LIB_DIR") {
            let dir = std::path::Path::new(&dir);
            if !dir.is_dir() {
                panic!(
                    "CPASSWORDSDK_LIB_DIR={} is not a directory",
                    dir.display()
                );
            }
            println!("cargo:rustc-link-search=native={}", dir.display());
        }
    }
}
