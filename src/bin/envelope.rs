use std::env;
use std::time::Instant;

use blinker_protocol::{
    Config, Dispatch, MergePolicy, ParseOutcome, Platform, Protocol, Transport,
};

/// Broker stand-in writing everything sent to stdout
struct Stdout;

impl Transport for Stdout {
    fn init(&mut self) -> bool {
        true
    }

    fn connect(&mut self) -> bool {
        true
    }

    fn connected(&mut self) -> bool {
        true
    }

    fn disconnect(&mut self) {}

    fn re_register(&mut self) -> bool {
        true
    }

    fn available(&mut self) -> bool {
        false
    }

    fn last_read(&self) -> &str {
        ""
    }

    fn flush(&mut self) {}

    fn print(&mut self, data: &str, _checked: bool) {
        println!("{}", data);
    }
}

struct Ignore;

impl Dispatch for Ignore {
    fn parse(&mut self, _payload: &str) -> ParseOutcome {
        ParseOutcome::Consumed
    }

    fn ntp_init(&mut self) -> bool {
        true
    }
}

struct Host {
    start: Instant,
}

impl Platform for Host {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    fn free_heap(&self) -> u32 {
        u32::MAX
    }

    fn link_up(&self) -> bool {
        true
    }

    fn reconnect_link(&mut self) {}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let policy = match args.first().map(String::as_str) {
        Some("--replace") => {
            args.remove(0);
            MergePolicy::Replace
        }
        _ => MergePolicy::Append,
    };
    if args.is_empty() {
        return Err("Provide at least 1 key=value argument".into());
    }

    let platform = Host {
        start: Instant::now(),
    };
    let mut protocol: Protocol<Stdout, Ignore, Host> = Protocol::with_config(
        Stdout,
        Ignore,
        platform,
        Config::default().merge_policy(policy),
    );
    if !protocol.connect() {
        return Err("could not connect".into());
    }

    for arg in &args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("not a key=value pair: {}", arg))?;
        match value.parse::<f64>() {
            Ok(number) => protocol.print_field(key, &number),
            Err(_) => protocol.print_field(key, value),
        }
    }
    protocol.print_now();
    Ok(())
}
