use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_ticks: Option<u64>,
    pub key_spec: Option<String>,
    pub console_enabled: bool,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub journal_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_ticks: None,
            key_spec: None,
            console_enabled: true,
            json_logs: false,
            metrics_addr: None,
            journal_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-ticks" => {
                    if i + 1 < args.len() {
                        cfg.run_ticks = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--keys" => {
                    if i + 1 < args.len() {
                        cfg.key_spec = Some(args[i + 1].clone());
                        // A replay feed never shares the run with the terminal.
                        cfg.console_enabled = false;
                        i += 1;
                    }
                }
                "--no-console" => {
                    cfg.console_enabled = false;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    if i + 1 < args.len() {
                        cfg.metrics_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--journal" => {
                    if i + 1 < args.len() {
                        cfg.journal_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"deskbuddy - Keyboard-driven desk robot controller

USAGE:
    deskbuddy [OPTIONS]

OPTIONS:
    --run-ticks <N>         Stop after N simulation ticks
    --keys <SPEC>           Replay a scripted key feed instead of the terminal.
                            Comma-separated key@tick entries (space spelled out),
                            e.g. w@10,space@40,q@200. Implies --no-console and
                            runs unpaced.
    --no-console            Do not attach the terminal (headless run)
    --json-logs             Output logs in JSON format (for log aggregation)
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --journal <PATH>        Append an action journal to the specified JSONL file
    -h, --help              Print this help message

CONTROLS (console mode):
    F = forward     R = backward    L = turn left   G = turn right
    SPACE = stop    W = wave        B = blink       P = patrol
    D = dance       S = reset       Q = quit

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,deskbuddy=trace)

EXAMPLES:
    # Interactive run with metrics
    deskbuddy --metrics-addr 0.0.0.0:9090

    # Headless replay with a journal
    deskbuddy --keys w@10,b@80,q@200 --journal /tmp/run.jsonl

    # Fixed-length headless run
    deskbuddy --run-ticks 1000 --no-console
"#
        );
    }
}
