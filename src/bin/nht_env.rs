use nht_scripts::Runner;

fn main() {
    std::process::exit(Runner::default().run_process("env"));
}
