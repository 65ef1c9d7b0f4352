use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "STRATA_GATEWAY_ADDR", default_value = "0.0.0.0:1337")]
    pub listen_addr: String,

    #[arg(long, env = "STRATA_APP_ID")]
    pub application_id: String,

    /// Public URL of the API; its path is the server root stripped from
    /// dispatched paths.
    #[arg(long, env = "STRATA_SERVER_URL", default_value = "http://localhost:1337/parse")]
    pub server_url: String,

    /// REST server for calls no internal route handles. Without it such
    /// calls fail as unroutable.
    #[arg(long, env = "STRATA_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    #[arg(long, env = "STRATA_MASTER_KEY")]
    pub master_key: Option<String>,

    /// "text" or "json".
    #[arg(long, env = "STRATA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// OTLP/HTTP endpoint for exporting traces.
    #[arg(long, env = "STRATA_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "STRATA_OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}
