fn main() -> std::process::ExitCode {
    report_builder_lib::run()
}
