fn main() {
    #[cfg(feature = "build-info")]
    built::write_built_file().expect("Failed to acquire build-time information");
}
