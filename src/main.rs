fn main() -> std::process::ExitCode {
    strokewatch_lib::run()
}
