use anyhow::{anyhow, bail, Context, Result};
use siddu_api::{
    EngagementRecord, FeedFilter, FeedItem, FeedQuery, ItemKind, PulseCreate, ReactionKind,
    VoteKind,
};
use siddu_core::EngagementAction;
use siddu_pulse::{DispatchOutcome, EngagementRemote, FeedEngine};
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  feed [latest|popular|following|trending] [#tag]   switch feed
  more                                            load the next page
  show                                            print the loaded feed
  react <id> <love|fire|mindblown|laugh|sad|angry>
  bookmark <id>
  share <id>
  comment <id> <text...>
  comments <id>
  reviews <file.json>                             show reviews from a JSON export
  vote <review_id> <helpful|unhelpful>
  post <text...>
  delete <id>
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Feed(FeedQuery),
    More,
    Show,
    Act { id: String, action: EngagementAction },
    Comments(String),
    Reviews(PathBuf),
    Post(String),
    Delete(String),
}

fn arg<'a>(words: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    words
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing <{}>\n{}", name, HELP))
}

fn rest(words: &[String], from: usize, name: &str) -> Result<String> {
    if words.len() <= from {
        bail!("Missing <{}>\n{}", name, HELP);
    }
    Ok(words[from..].join(" "))
}

impl Command {
    pub fn parse(words: &[String]) -> Result<Self> {
        let verb = arg(words, 0, "command")?;
        let command = match verb {
            "feed" => {
                let mut query = FeedQuery::default();
                for word in &words[1..] {
                    if let Some(tag) = word.strip_prefix('#') {
                        query.hashtag = Some(tag.to_lowercase());
                    } else {
                        query.filter = word.parse::<FeedFilter>().map_err(|e| anyhow!(e))?;
                    }
                }
                Command::Feed(query)
            }
            "more" => Command::More,
            "show" => Command::Show,
            "react" => {
                let kind = arg(words, 2, "reaction")?
                    .parse::<ReactionKind>()
                    .map_err(|e| anyhow!(e))?;
                Command::Act {
                    id: arg(words, 1, "id")?.to_string(),
                    action: EngagementAction::React(kind),
                }
            }
            "bookmark" => Command::Act {
                id: arg(words, 1, "id")?.to_string(),
                action: EngagementAction::ToggleBookmark,
            },
            "share" => Command::Act {
                id: arg(words, 1, "id")?.to_string(),
                action: EngagementAction::Share,
            },
            "comment" => Command::Act {
                id: arg(words, 1, "id")?.to_string(),
                action: EngagementAction::Comment {
                    content: rest(words, 2, "text")?,
                },
            },
            "vote" => {
                let kind = arg(words, 2, "vote")?
                    .parse::<VoteKind>()
                    .map_err(|e| anyhow!(e))?;
                Command::Act {
                    id: arg(words, 1, "review_id")?.to_string(),
                    action: EngagementAction::Vote(kind),
                }
            }
            "comments" => Command::Comments(arg(words, 1, "id")?.to_string()),
            "reviews" => Command::Reviews(PathBuf::from(arg(words, 1, "file.json")?)),
            "post" => Command::Post(rest(words, 1, "text")?),
            "delete" => Command::Delete(arg(words, 1, "id")?.to_string()),
            other => bail!("Unknown command '{}'\n{}", other, HELP),
        };
        Ok(command)
    }
}

/// Parse a JSON array of reviews:
/// `[{"id": "r1", "helpfulCount": 3, "unhelpfulCount": 1, "userVote": "helpful", "content": "..."}]`
pub fn parse_reviews(json: &str) -> Result<Vec<FeedItem>> {
    let value: serde_json::Value = serde_json::from_str(json).context("Failed to parse reviews JSON")?;
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("Reviews JSON must be an array"))?;

    entries
        .iter()
        .map(|entry| {
            let id = entry["id"]
                .as_str()
                .ok_or_else(|| anyhow!("Review without id: {}", entry))?;
            let mut record = EngagementRecord::default();
            record.helpful_count = entry["helpfulCount"].as_u64().unwrap_or(0);
            record.unhelpful_count = entry["unhelpfulCount"].as_u64().unwrap_or(0);
            record.user_vote = entry["userVote"]
                .as_str()
                .map(|v| v.parse::<VoteKind>().map_err(|e| anyhow!(e)))
                .transpose()?;
            let payload = serde_json::json!({ "content": { "text": entry["content"] } });
            Ok(FeedItem::review(id, record).with_payload(payload))
        })
        .collect()
}

fn summary(item: &FeedItem) -> String {
    let record = &item.engagement;
    let counters = match item.kind {
        ItemKind::Pulse => {
            let mine = record
                .user_reaction
                .map(|r| format!(" (you: {})", r))
                .unwrap_or_default();
            format!(
                "{} reactions{}, {} comments, {} shares{}",
                record.total,
                mine,
                record.comments,
                record.shares,
                if record.has_bookmarked { ", bookmarked" } else { "" }
            )
        }
        ItemKind::Review => format!(
            "{} helpful, {} unhelpful{}",
            record.helpful_count,
            record.unhelpful_count,
            record
                .user_vote
                .map(|v| format!(" (you: {})", v))
                .unwrap_or_default()
        ),
    };
    let text = item.payload["content"]["text"].as_str().unwrap_or("");
    format!("{}  {}\n    {}", item.id, counters, text)
}

pub async fn run<R: EngagementRemote + 'static>(engine: &FeedEngine<R>, command: Command) -> Result<()> {
    match command {
        Command::Feed(query) => {
            let count = engine.change_query(query).await?;
            println!("Loaded {} posts", count);
            print_feed(engine).await;
        }
        Command::More => {
            let state = engine.pagination().await;
            if !state.has_more {
                println!("No more posts");
                return Ok(());
            }
            let added = engine.load_more().await?;
            println!("Loaded {} more posts (page {})", added, engine.pagination().await.page);
        }
        Command::Show => print_feed(engine).await,
        Command::Act { id, action } => {
            let outcome = engine.dispatch(&id, action).await;
            match outcome {
                DispatchOutcome::Confirmed | DispatchOutcome::Reverted | DispatchOutcome::Resynced => {
                    if let Some(item) = engine.get(&id).await {
                        println!("{}", summary(&item));
                    }
                }
                DispatchOutcome::Suppressed => println!("Still saving the previous action on {}", id),
                DispatchOutcome::UnknownItem => println!("No post {} in the loaded feed", id),
                DispatchOutcome::NotApplicable => println!("That action does not apply to {}", id),
                DispatchOutcome::AuthRequired | DispatchOutcome::Abandoned => {}
            }
        }
        Command::Comments(id) => {
            engine.load_comments(&id).await?;
            for comment in engine.comments(&id).await {
                let author = comment.author["username"].as_str().unwrap_or("someone");
                println!("  {}: {}", author, comment.content);
            }
        }
        Command::Reviews(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read reviews file {}", path.display()))?;
            let reviews = parse_reviews(&json)?;
            let ids: Vec<String> = reviews.iter().map(|r| r.id.clone()).collect();
            engine.set_items(reviews).await;
            for id in ids {
                // Best effort; shown as "no vote" if it fails
                if let Err(e) = engine.load_user_vote(&id).await {
                    tracing::warn!("[siddu-cli] Could not load vote for {}: {}", id, e);
                }
            }
            print_feed(engine).await;
        }
        Command::Post(text) => {
            let item = engine.create_pulse(PulseCreate::text(text)).await?;
            println!("Posted {}", item.id);
        }
        Command::Delete(id) => {
            engine.delete_pulse(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

async fn print_feed<R: EngagementRemote + 'static>(engine: &FeedEngine<R>) {
    for item in engine.items().await {
        println!("{}", summary(&item));
    }
}
