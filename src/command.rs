pub const USAGE: &str = "Usage: weather-updates [serve | send-weather-updates [--force-all]]";

/// Command selected on the command line
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server, plus the dispatch scheduler when enabled
    Serve,
    /// Run a single dispatch and exit
    SendWeatherUpdates { force_all: bool },
}

impl Command {
    /// Parse the arguments following the program name. No arguments means `serve`.
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        let command = match args.next().as_deref() {
            None | Some("serve") => Self::Serve,
            Some("send-weather-updates") => Self::SendWeatherUpdates { force_all: false },
            Some(other) => return Err(format!("unknown command `{}`", other)),
        };

        match command {
            Self::Serve => {
                if let Some(arg) = args.next() {
                    return Err(format!("unexpected argument `{}`", arg));
                }
                Ok(Self::Serve)
            }
            Self::SendWeatherUpdates { mut force_all } => {
                for arg in args {
                    match arg.as_str() {
                        "--force-all" if !force_all => force_all = true,
                        "--force-all" => {
                            return Err("`--force-all` provided more than once".to_string())
                        }
                        other => return Err(format!("unexpected argument `{}`", other)),
                    }
                }
                Ok(Self::SendWeatherUpdates { force_all })
            }
        }
    }
}
