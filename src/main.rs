use tunedrop::automation::AutomationCommand;

#[derive(Debug, Default)]
struct CliArgs {
    download: Option<String>,
    share: Option<String>,
    automate: bool,
    browser: bool,
}

impl CliArgs {
    fn is_headless(&self) -> bool {
        self.download.is_some() || self.share.is_some() || self.automate || self.browser
    }
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    let _logger = tunedrop::logging::init(args.is_headless())?;
    log::info!("tunedrop {} starting", env!("CARGO_PKG_VERSION"));

    if let Some(url) = args.download {
        return tunedrop::app::run_download(&url);
    }
    if let Some(text) = args.share {
        return tunedrop::app::run_share(&text);
    }
    if args.automate {
        return tunedrop::app::run_automation(AutomationCommand::Trigger);
    }
    if args.browser {
        return tunedrop::app::run_automation(AutomationCommand::FetchBrowserUrl);
    }

    tunedrop::app::run()
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--download" | "--share" => {
                let flag = args[index].clone();
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("{flag} requires a value");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("{flag} cannot be empty");
                }
                let value = value.trim().to_string();
                if flag == "--download" {
                    out.download = Some(value);
                } else {
                    out.share = Some(value);
                }
            }
            "--automate" => out.automate = true,
            "--browser" => out.browser = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }

    let modes = [out.download.is_some(), out.share.is_some(), out.automate, out.browser];
    if modes.into_iter().filter(|mode| *mode).count() > 1 {
        anyhow::bail!("pick one of --download, --share, --automate, --browser");
    }
    Ok(out)
}

fn print_help() {
    println!("TuneDrop");
    println!("  (no flags)          Run the terminal app");
    println!("  --download <url>    Download one YouTube URL as MP3 and exit");
    println!("  --share <text>      Handle shared text like the share target");
    println!("  --automate          Run the share automation on the adb device");
    println!("  --browser           Grab the browser URL from the device and download it");
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_flags_runs_the_tui() {
        let parsed = parse_args(Vec::new()).expect("parse");
        assert!(!parsed.is_headless());
    }

    #[test]
    fn download_takes_a_value() {
        let parsed = parse_args(args(&["--download", " https://youtu.be/a "])).expect("parse");
        assert_eq!(parsed.download.as_deref(), Some("https://youtu.be/a"));
        assert!(parse_args(args(&["--download"])).is_err());
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(parse_args(args(&["--automate", "--browser"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }
}
