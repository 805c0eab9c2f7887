//! Resource graph and the line-driven command loop.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use futures::StreamExt as _;
use tether_core::{
  ResultState,
  feed::{Feed, FeedEvent, FeedSnapshot},
  list::ListSingleSourceOfTruth,
  pagination::Dispatch,
  ssot::SingleSourceOfTruth,
  venue::{Point, Venue, VenueDetail},
};
use tether_remote::{ApiClient, ExploreSource, VenueDetailSource};
use tether_store_sqlite::SqliteStore;
use tokio::{
  io::{AsyncBufReadExt as _, BufReader},
  runtime::Handle,
};
use tracing::info;

use crate::Settings;

type VenueList = ListSingleSourceOfTruth<Venue, SqliteStore<Venue>, ExploreSource>;
type VenueDetails = SingleSourceOfTruth<VenueDetail, SqliteStore<VenueDetail>, VenueDetailSource>;

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  /// Load the next page.
  More,
  /// Drop everything and reload from page 0.
  Refresh,
  /// Explore around a new location.
  Move(Point),
  /// Show the full record for a venue.
  Show(String),
  /// Print the current collection.
  List,
  Help,
  Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>> {
  let mut words = line.split_whitespace();
  let Some(verb) = words.next() else {
    return Ok(None);
  };

  let command = match verb {
    "more" | "next" | "n" => Command::More,
    "refresh" | "r" => Command::Refresh,
    "move" | "m" => {
      let (Some(lat), Some(lng)) = (words.next(), words.next()) else {
        bail!("usage: move <lat> <lng>");
      };
      let lat = lat.parse::<f64>().with_context(|| format!("invalid latitude {lat:?}"))?;
      let lng = lng.parse::<f64>().with_context(|| format!("invalid longitude {lng:?}"))?;
      Command::Move(Point::new(lat, lng))
    }
    "show" | "s" => match words.next() {
      Some(id) => Command::Show(id.to_owned()),
      None => bail!("usage: show <venue id>"),
    },
    "list" | "ls" => Command::List,
    "help" | "?" => Command::Help,
    "quit" | "exit" | "q" => Command::Quit,
    other => bail!("unknown command {other:?}; try `help`"),
  };
  Ok(Some(command))
}

const HELP: &str = "\
commands:
  more            load the next page
  refresh         drop cached venues and reload
  move <lat> <lng> explore around another location
  show <id>       venue details (cached, else fetched)
  list            print loaded venues
  quit";

// ─── App ──────────────────────────────────────────────────────────────────────

/// The assembled resources. Built once at startup and passed down explicitly.
pub struct App {
  explore: Arc<ExploreSource>,
  feed:    Arc<Feed<Venue>>,
  details: Arc<VenueDetails>,
}

impl App {
  pub async fn open(settings: &Settings) -> Result<Self> {
    if let Some(parent) = settings.store_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let venues: SqliteStore<Venue> = SqliteStore::open(&settings.store_path, "venues")
      .await
      .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
    let venue_details: SqliteStore<VenueDetail> = venues.resource("venue_details");

    let client = ApiClient::new(settings.remote.clone()).context("failed to build API client")?;
    let explore = Arc::new(ExploreSource::new(
      client.clone(),
      Point::new(settings.lat, settings.lng),
      settings.pagination.page_size,
    ));

    let runtime = Handle::current();
    let details: Arc<VenueDetails> = Arc::new(SingleSourceOfTruth::new(
      Arc::new(venue_details),
      Arc::new(VenueDetailSource::new(client)),
      runtime.clone(),
    ));
    let list: VenueList =
      ListSingleSourceOfTruth::new(Arc::new(venues), Arc::clone(&explore), runtime.clone());

    let feed = Feed::builder(list)
      .pagination(settings.pagination)
      .invalidates(details.clone())
      .spawn(&runtime);

    info!(store = %settings.store_path.display(), location = %explore.location(), "tether ready");
    Ok(Self { explore, feed: Arc::new(feed), details })
  }

  pub async fn run(self) -> Result<()> {
    let renderer = tokio::spawn(render(Arc::clone(&self.feed)));

    report("init", self.feed.init().await?);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
      let command = match parse_command(&line) {
        Ok(Some(command)) => command,
        Ok(None) => continue,
        Err(e) => {
          println!("{e:#}");
          continue;
        }
      };
      if command == Command::Quit {
        break;
      }
      self.execute(command).await?;
    }

    renderer.abort();
    Ok(())
  }

  async fn execute(&self, command: Command) -> Result<()> {
    match command {
      Command::More => report("more", self.feed.request_next_page().await?),
      Command::Refresh => report("refresh", self.feed.refresh().await?),
      Command::Move(location) => {
        self.explore.set_location(location);
        self.feed.invalidate().await?;
        report("move", self.feed.init().await?);
      }
      Command::Show(id) => self.show(&id).await,
      Command::List => print_venues(&self.feed.snapshot()),
      Command::Help => println!("{HELP}"),
      Command::Quit => {}
    }
    Ok(())
  }

  async fn show(&self, id: &str) {
    if let ResultState::Success(detail) = self.details.get_instant(id).await {
      print_detail(&detail, true);
      return;
    }

    let mut states = self.details.fetch(id);
    while let Some(state) = states.next().await {
      match state {
        ResultState::Loading => println!("fetching {id}…"),
        ResultState::Success(detail) => print_detail(&detail, false),
        ResultState::Error(failure) => println!("could not load {id}: {failure}"),
        ResultState::Empty => println!("no venue {id}"),
      }
    }
  }
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn report(trigger: &str, dispatch: Dispatch) {
  match dispatch {
    Dispatch::Started { page, offset } => {
      println!("{trigger}: loading page {page} (offset {offset})")
    }
    Dispatch::InFlight => println!("{trigger}: a page is already loading"),
    Dispatch::Exhausted => println!("{trigger}: no more pages"),
    Dispatch::AlreadyLoaded => println!("{trigger}: showing loaded venues"),
  }
}

/// Print a status line whenever the published state changes, and every
/// one-shot event exactly once.
async fn render(feed: Arc<Feed<Venue>>) {
  let mut snapshots = feed.subscribe();
  loop {
    tokio::select! {
      changed = snapshots.changed() => {
        if changed.is_err() {
          break;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        print_status(&snapshot);
      }
      event = feed.next_event() => match event {
        FeedEvent::Message(message) => println!("! {message}"),
        FeedEvent::LocationChanged => println!("! location changed, venues cleared"),
      },
    }
  }
}

fn print_status(snapshot: &FeedSnapshot<Venue>) {
  let state = if snapshot.loading {
    "loading"
  } else if !snapshot.available {
    "unavailable"
  } else {
    "idle"
  };
  let source = if snapshot.from_cache { " (cached)" } else { "" };
  println!(
    "[{state}] {} venues{source}, page {}/{}",
    snapshot.items.len(),
    snapshot.pagination.page,
    snapshot.pagination.max_page,
  );
}

fn print_venues(snapshot: &FeedSnapshot<Venue>) {
  if snapshot.items.is_empty() {
    println!("no venues loaded");
    return;
  }
  for (i, venue) in snapshot.items.iter().enumerate() {
    let category = venue.category.as_deref().unwrap_or("-");
    match venue.distance {
      Some(d) => println!("{i:>3}. {} [{category}] {d} m  ({})", venue.name, venue.id),
      None => println!("{i:>3}. {} [{category}]  ({})", venue.name, venue.id),
    }
  }
}

fn print_detail(detail: &VenueDetail, cached: bool) {
  println!("{}{}", detail.name, if cached { " (cached)" } else { "" });
  println!("  at {}", detail.location);
  let fields = [
    ("address", detail.address.clone()),
    ("categories", (!detail.categories.is_empty()).then(|| detail.categories.join(", "))),
    ("rating", detail.rating.map(|r| format!("{r:.1}/10"))),
    ("phone", detail.phone.clone()),
    ("url", detail.url.clone()),
    ("about", detail.description.clone()),
  ];
  for (label, value) in fields {
    if let Some(value) = value {
      println!("  {label}: {value}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_verbs_and_aliases() {
    assert_eq!(parse_command("more").unwrap(), Some(Command::More));
    assert_eq!(parse_command("  n ").unwrap(), Some(Command::More));
    assert_eq!(parse_command("refresh").unwrap(), Some(Command::Refresh));
    assert_eq!(parse_command("show 4b5c").unwrap(), Some(Command::Show("4b5c".into())));
    assert_eq!(parse_command("q").unwrap(), Some(Command::Quit));
  }

  #[test]
  fn parses_move_coordinates() {
    assert_eq!(
      parse_command("move -33.86 151.2").unwrap(),
      Some(Command::Move(Point::new(-33.86, 151.2)))
    );
  }

  #[test]
  fn blank_line_is_no_command() {
    assert_eq!(parse_command("   ").unwrap(), None);
  }

  #[test]
  fn rejects_bad_input() {
    assert!(parse_command("move 1").is_err());
    assert!(parse_command("move north 2").is_err());
    assert!(parse_command("show").is_err());
    assert!(parse_command("dance").is_err());
  }
}
