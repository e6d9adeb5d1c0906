use clap::Args;

/// Anomaly scoring weights and thresholds.
#[derive(Debug, Clone, Args)]
pub struct CliAnomalyFlags {
    #[arg(
        long = "activity-low-watermark",
        env = "PENNY_ACTIVITY_LOW_WATERMARK",
        default_value_t = 0,
        help = "Posters with fewer public messages than this are suspect (0 disables the check)"
    )]
    pub activity_low_watermark: u64,

    #[arg(
        long = "activity-search-after",
        env = "PENNY_ACTIVITY_SEARCH_AFTER",
        default_value = "2021/12/01",
        help = "Only count public messages after this date (YYYY/MM/DD)"
    )]
    pub activity_search_after: String,

    #[arg(
        long = "local-timezone",
        env = "PENNY_LOCAL_TIMEZONE",
        help = "IANA timezone of the community, e.g. America/New_York (unset disables the check)"
    )]
    pub local_timezone: Option<String>,

    #[arg(
        long = "anomaly-score-reported",
        env = "PENNY_ANOMALY_SCORE_REPORTED",
        default_value_t = 2,
        help = "Points added for every community report"
    )]
    pub anomaly_score_reported: u32,

    #[arg(
        long = "anomaly-score-low-activity",
        env = "PENNY_ANOMALY_SCORE_LOW_ACTIVITY",
        default_value_t = 1,
        help = "Points added when the poster is below the activity low watermark"
    )]
    pub anomaly_score_low_activity: u32,

    #[arg(
        long = "anomaly-score-outside-tz",
        env = "PENNY_ANOMALY_SCORE_OUTSIDE_TZ",
        default_value_t = 2,
        help = "Points added when the poster's timezone differs from --local-timezone"
    )]
    pub anomaly_score_outside_tz: u32,

    #[arg(
        long = "max-anomaly-score",
        env = "PENNY_MAX_ANOMALY_SCORE",
        default_value_t = 5,
        help = "Scores at or above this remove the reported post"
    )]
    pub max_anomaly_score: u32,
}
