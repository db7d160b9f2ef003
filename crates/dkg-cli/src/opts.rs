use gumdrop::Options;
use std::default::Default;

#[derive(Debug, Options, Clone)]
pub struct DkgOpts {
    help: bool,
    #[options(command)]
    pub command: Option<Command>,
}

// The supported commands
#[derive(Debug, Options, Clone)]
pub enum Command {
    #[options(
        help = "creates a transport keypair; set `transport_key` in the node configuration to register it"
    )]
    Keygen(KeygenOpts),

    #[options(help = "prints a summary of the node's persisted DKG state")]
    Inspect(InspectOpts),

    #[options(help = "prints the default node configuration")]
    Config(ConfigOpts),
}

#[derive(Debug, Options, Clone)]
pub struct KeygenOpts {
    help: bool,

    #[options(help = "path to the file where the keys will be written (stdout if none provided)")]
    pub path: Option<String>,
}

#[derive(Debug, Options, Clone)]
pub struct InspectOpts {
    help: bool,

    #[options(help = "path to the node's JSON configuration", required)]
    pub config: String,
}

#[derive(Debug, Options, Clone, Default)]
pub struct ConfigOpts {
    help: bool,

    #[options(help = "path to the file where the configuration will be written (stdout if none provided)")]
    pub path: Option<String>,
}
