use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use linear_facade::config::Config;
use linear_facade::linear::types::{Assignee, IssueChanges, NewIssue, SearchParams};
use linear_facade::linear::ResilientClient;
use linear_facade::logging::{self, LogTarget};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linear-facade")]
#[command(about = "Rate-limited, caching access to the Linear issue tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/linear-facade/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log to stderr instead of the log file
  #[arg(long)]
  log_stderr: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List teams
  Teams,
  /// Search issues
  Search {
    /// Case-insensitive title substring
    #[arg(default_value = "")]
    query: String,
    #[arg(long)]
    team: Option<String>,
    /// Workflow state name
    #[arg(long)]
    status: Option<String>,
    /// User id, or "me"
    #[arg(long)]
    assignee: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Show one issue
  Issue { id: String },
  /// Create an issue
  Create {
    #[arg(long)]
    team: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// User id, or "me"
    #[arg(long)]
    assignee: Option<String>,
    /// 0 = none, 1 = urgent .. 4 = low
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    priority: Option<u8>,
  },
  /// Update an issue
  Update {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// User id, "me", or "" to unassign
    #[arg(long, conflicts_with = "unassign")]
    assignee: Option<String>,
    #[arg(long)]
    unassign: bool,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    priority: Option<u8>,
    /// Workflow state id
    #[arg(long)]
    state: Option<String>,
  },
  /// List workflow states of one or more teams
  States {
    #[arg(required = true)]
    teams: Vec<String>,
  },
  /// Comment on an issue
  Comment { issue: String, body: String },
  /// Show the owner of the API key
  Whoami,
  /// Check API connectivity
  Health,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let target = if args.log_stderr {
    LogTarget::Stderr
  } else {
    LogTarget::default_file()?
  };
  let _log_guard = logging::init(target)?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let api_key = Config::get_api_key()?;

  let client = ResilientClient::from_config(&config, &api_key)
    .map_err(|e| eyre!("Failed to create Linear client: {}", e))?;

  match args.command {
    Command::Teams => print_json(&client.get_teams().await?)?,
    Command::Search {
      query,
      team,
      status,
      assignee,
      limit,
    } => {
      let params = SearchParams {
        query,
        team_id: team,
        status,
        assignee: Assignee::from_optional(assignee.as_deref()),
        limit,
      };
      print_json(&client.search_issues(&params).await?)?
    }
    Command::Issue { id } => print_json(&client.get_issue(&id).await?)?,
    Command::Create {
      team,
      title,
      description,
      assignee,
      priority,
    } => {
      let new_issue = NewIssue {
        description,
        assignee: Assignee::from_optional(assignee.as_deref()),
        priority,
        ..NewIssue::new(team, title)
      };
      print_json(&client.create_issue(&new_issue).await?)?
    }
    Command::Update {
      id,
      title,
      description,
      assignee,
      unassign,
      priority,
      state,
    } => {
      let assignee = if unassign {
        Assignee::Unassign
      } else {
        Assignee::from_optional(assignee.as_deref())
      };
      let changes = IssueChanges {
        title,
        description,
        assignee,
        priority,
        state_id: state,
      };
      print_json(&client.update_issue(&id, &changes).await?)?
    }
    Command::States { teams } => {
      let lookups = teams.iter().map(|team| client.get_workflow_states(team));
      let states = futures::future::try_join_all(lookups).await?;
      let by_team: std::collections::BTreeMap<_, _> = teams.iter().zip(states).collect();
      print_json(&by_team)?
    }
    Command::Comment { issue, body } => print_json(&client.add_comment(&issue, &body).await?)?,
    Command::Whoami => print_json(&client.get_viewer().await?)?,
    Command::Health => print_json(&client.health_check().await)?,
  }

  Ok(())
}
