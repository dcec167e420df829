fn main() -> std::io::Result<()> {
    // git commit hash and build metadata for --version and /health
    built::write_built_file()
}
