use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "tournament-calendar-sync")]
#[command(about = "Sync start.gg tournaments into Discord scheduled events")]
pub struct Cli {
    /// Log in to Discord, preview the start.gg data and exit
    #[arg(short = 't', long = "test")]
    pub test: bool,

    /// Create events in every server once and exit
    #[arg(long = "trigger", visible_alias = "manual")]
    pub trigger: bool,

    /// Delete every scheduled event in every server and exit
    #[arg(long = "clear", visible_alias = "clear-events")]
    pub clear: bool,

    /// Preview the start.gg data without connecting to Discord
    #[arg(short = 'a', long = "api-only")]
    pub api_only: bool,

    /// Country code filter, overrides COUNTRY_CODE
    #[arg(long)]
    pub country: Option<String>,

    /// Comma separated videogame ids, overrides VIDEOGAME_IDS
    #[arg(long, value_delimiter = ',')]
    pub games: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ApiOnly,
    Test,
    Trigger,
    Clear,
    Scheduled,
}

impl Cli {
    /// Selected mode; earlier flags win when several are given.
    pub fn mode(&self) -> Mode {
        if self.api_only {
            Mode::ApiOnly
        } else if self.test {
            Mode::Test
        } else if self.trigger {
            Mode::Trigger
        } else if self.clear {
            Mode::Clear
        } else {
            Mode::Scheduled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_is_scheduled_mode() {
        let cli = Cli::parse_from(["tournament-calendar-sync"]);
        assert_eq!(cli.mode(), Mode::Scheduled);
        assert!(cli.country.is_none());
        assert!(cli.games.is_none());
    }

    #[test]
    fn aliases_select_modes() {
        assert_eq!(Cli::parse_from(["x", "--manual"]).mode(), Mode::Trigger);
        assert_eq!(Cli::parse_from(["x", "--clear-events"]).mode(), Mode::Clear);
        assert_eq!(Cli::parse_from(["x", "-t"]).mode(), Mode::Test);
        assert_eq!(Cli::parse_from(["x", "-a"]).mode(), Mode::ApiOnly);
    }

    #[test]
    fn each_flag_selects_its_own_mode() {
        let cases = [
            ("--api-only", Mode::ApiOnly),
            ("--test", Mode::Test),
            ("--trigger", Mode::Trigger),
            ("--clear", Mode::Clear),
        ];
        for (flag, mode) in cases {
            assert_eq!(Cli::parse_from(["x", flag]).mode(), mode, "{}", flag);
        }
    }

    #[test]
    fn api_only_wins_over_other_flags() {
        let cli = Cli::parse_from(["x", "--clear", "--trigger", "--api-only"]);
        assert_eq!(cli.mode(), Mode::ApiOnly);
    }

    #[test]
    fn filter_overrides_are_parsed() {
        let cli = Cli::parse_from(["x", "-a", "--country=us", "--games=1,1386"]);
        assert_eq!(cli.country.as_deref(), Some("us"));
        assert_eq!(cli.games, Some(vec![1, 1386]));
    }

    #[test]
    fn invalid_games_are_rejected() {
        assert!(Cli::try_parse_from(["x", "--games=abc"]).is_err());
    }
}
