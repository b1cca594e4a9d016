fn main() {
    std::process::exit(ludus_magnus::run());
}
