//! Bookshelf CLI - a command-line client for the book-catalog service.
//!
//! Provides keyboard-friendly access to the catalog: login/logout,
//! profile management, catalog search, and favorites.

use std::io::{self, Write};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bookshelf_core::models::{BookQuery, LoginRequest, RegisterRequest, ResetPasswordRequest};
use bookshelf_core::{ApiClient, Config, CredentialStore, Session};

const USAGE: &str = "\
bookshelf - command-line client for the book catalog

USAGE:
    bookshelf login [username]        Log in and store credentials
    bookshelf logout                  Log out and clear credentials
    bookshelf register <user> <email> Create an account
    bookshelf whoami                  Show the current session
    bookshelf verify                  Check the stored token against the server
    bookshelf profile                 Show the server-side profile
    bookshelf profile set <k> <v>     Update one profile field
    bookshelf reset-password <email>  Request a password reset
    bookshelf books [filters]         Search the catalog
        --title <t> --genre <g> --from-year <y> --to-year <y>
        --page <n> --limit <n>
    bookshelf book <id>               Show one catalog entry
    bookshelf recommended <id>        Show recommendations for an entry
    bookshelf favorites               List favorites
    bookshelf favorites add <id>      Add a favorite
    bookshelf favorites remove <id>   Remove a favorite

The backend base URL comes from BOOKSHELF_API_URL (or ~/.config config).
";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut config = Config::load().context("Failed to load configuration")?;
    let store = CredentialStore::new(config.credentials_dir()?, !config.is_local_dev());
    let mut session = Session::new(store);
    session.initialize_auth();

    let session = Arc::new(RwLock::new(session));
    let client = ApiClient::new(config.api_base_url(), Arc::clone(&session))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("login") => cmd_login(&client, &session, &mut config, args.get(1).cloned()).await,
        Some("logout") => cmd_logout(&client, &session).await,
        Some("register") => cmd_register(&client, &args[1..]).await,
        Some("whoami") => cmd_whoami(&session),
        Some("verify") => cmd_verify(&client).await,
        Some("profile") => cmd_profile(&client, &session, &args[1..]).await,
        Some("reset-password") => cmd_reset_password(&client, &args[1..]).await,
        Some("books") => cmd_books(&client, &args[1..]).await,
        Some("book") => cmd_book(&client, parse_id(&args, 1)?).await,
        Some("recommended") => cmd_recommended(&client, parse_id(&args, 1)?).await,
        Some("favorites") => cmd_favorites(&client, &args[1..]).await,
        _ => {
            print!("{}", USAGE);
            Ok(())
        }
    }
}

fn parse_id(args: &[String], index: usize) -> Result<i64> {
    args.get(index)
        .ok_or_else(|| anyhow!("Missing book id"))?
        .parse()
        .context("Book id must be a number")
}

async fn cmd_login(
    client: &ApiClient,
    session: &Arc<RwLock<Session>>,
    config: &mut Config,
    username: Option<String>,
) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(username) => username,
        None => prompt("Username or email: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let resp = client
        .login(&LoginRequest::new(username.clone(), password))
        .await?;

    session
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .set_credentials(resp.user, &resp.token)?;

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save configuration");
    }

    let session = session.read().unwrap_or_else(|e| e.into_inner());
    println!(
        "Logged in as {}",
        session.user().map(|u| u.display_name()).unwrap_or_default()
    );
    Ok(())
}

async fn cmd_logout(client: &ApiClient, session: &Arc<RwLock<Session>>) -> Result<()> {
    // Best effort server-side; the local session clears regardless
    if let Err(e) = client.logout().await {
        warn!(error = %e, "Server logout failed");
    }
    session.write().unwrap_or_else(|e| e.into_inner()).logout();
    client.clear_cache();
    println!("Logged out");
    Ok(())
}

async fn cmd_register(client: &ApiClient, args: &[String]) -> Result<()> {
    let username = args.first().ok_or_else(|| anyhow!("Missing username"))?;
    let email = args.get(1).ok_or_else(|| anyhow!("Missing email"))?;
    let password = rpassword::prompt_password("Password: ")?;

    let user = client
        .register(&RegisterRequest {
            username: username.clone(),
            email: email.clone(),
            password,
        })
        .await?;
    println!("Registered {} ({})", user.username, user.email);
    println!("Run `bookshelf login {}` to sign in", user.username);
    Ok(())
}

fn cmd_whoami(session: &Arc<RwLock<Session>>) -> Result<()> {
    let session = session.read().unwrap_or_else(|e| e.into_inner());
    match session.user() {
        Some(user) if session.is_authenticated() => {
            println!("{} <{}>", user.display_name(), user.email);
            if user.is_staff {
                println!("(staff)");
            }
        }
        _ => println!("Not logged in"),
    }
    Ok(())
}

async fn cmd_verify(client: &ApiClient) -> Result<()> {
    if client.verify_token().await? {
        println!("Token is valid");
    } else {
        println!("Token is invalid or expired - run `bookshelf login`");
    }
    Ok(())
}

async fn cmd_profile(
    client: &ApiClient,
    session: &Arc<RwLock<Session>>,
    args: &[String],
) -> Result<()> {
    if args.first().map(String::as_str) == Some("set") {
        let key = args.get(1).ok_or_else(|| anyhow!("Missing field name"))?;
        let value = args.get(2).ok_or_else(|| anyhow!("Missing field value"))?;

        let mut fields = Map::new();
        fields.insert(key.clone(), Value::String(value.clone()));
        let updated = client.update_profile(&Value::Object(fields)).await?;

        // adopt the refreshed snapshot wholesale
        let patch = serde_json::to_value(&updated)?
            .as_object()
            .cloned()
            .unwrap_or_default();
        session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .update_user(&patch)?;
        info!(field = %key, "Profile updated");
        println!("Updated {}", key);
        return Ok(());
    }

    let user = client.profile().await?;
    println!("{} <{}>", user.display_name(), user.email);
    println!("id: {}  staff: {}", user.id, user.is_staff);
    for (key, value) in &user.extra {
        println!("{}: {}", key, value);
    }
    Ok(())
}

async fn cmd_reset_password(client: &ApiClient, args: &[String]) -> Result<()> {
    let email = args.first().ok_or_else(|| anyhow!("Missing email"))?;
    client
        .reset_password(&ResetPasswordRequest { email: email.clone() })
        .await?;
    println!("Password reset requested for {}", email);
    Ok(())
}

fn parse_book_query(args: &[String]) -> Result<BookQuery> {
    let mut query = BookQuery::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--title" => query.title = Some(value.clone()),
            "--genre" => query.genre = Some(value.clone()),
            "--from-year" => query.from_year = Some(value.parse()?),
            "--to-year" => query.to_year = Some(value.parse()?),
            "--page" => query.page = Some(value.parse()?),
            "--limit" => query.limit = Some(value.parse()?),
            other => return Err(anyhow!("Unknown flag: {}", other)),
        }
    }
    Ok(query)
}

async fn cmd_books(client: &ApiClient, args: &[String]) -> Result<()> {
    let query = parse_book_query(args)?;
    let page = client.books(&query).await?;

    for book in &page.items {
        println!(
            "{:>6}  {}  {} - {} [{}]",
            book.id,
            book.rating_stars(),
            book.title,
            book.author,
            book.display_genre()
        );
    }
    println!(
        "page {} ({} of {} total)",
        page.page,
        page.items.len(),
        page.total
    );
    Ok(())
}

async fn cmd_book(client: &ApiClient, id: i64) -> Result<()> {
    let book = client.book(id).await?;
    println!("{} - {}", book.title, book.author);
    println!("genre: {}  rating: {}", book.display_genre(), book.rating_stars());
    if let Some(year) = book.publication_year {
        println!("published: {}", year);
    }
    if let Some(ref price) = book.price {
        println!("price: {}", price);
    }
    if let Some(ref description) = book.description {
        println!("\n{}", description);
    }
    Ok(())
}

async fn cmd_recommended(client: &ApiClient, id: i64) -> Result<()> {
    let books = client.recommended(id).await?;
    if books.is_empty() {
        println!("No recommendations");
        return Ok(());
    }
    for book in &books {
        println!("{:>6}  {} - {}", book.id, book.title, book.author);
    }
    Ok(())
}

async fn cmd_favorites(client: &ApiClient, args: &[String]) -> Result<()> {
    match (args.first().map(String::as_str), args.get(1)) {
        (Some("add"), Some(id)) => {
            client.add_favorite(id.parse()?).await?;
            println!("Added favorite {}", id);
        }
        (Some("remove"), Some(id)) => {
            client.remove_favorite(id.parse()?).await?;
            println!("Removed favorite {}", id);
        }
        (None, _) => {
            let favorites = client.favorites().await?;
            if favorites.is_empty() {
                println!("No favorites yet");
            }
            for favorite in &favorites {
                println!(
                    "{:>6}  {} - {}",
                    favorite.book.id, favorite.book.title, favorite.book.author
                );
            }
        }
        _ => return Err(anyhow!("Usage: bookshelf favorites [add <id> | remove <id>]")),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_query_flags() {
        let args: Vec<String> = ["--title", "dune", "--from-year", "1960"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let query = parse_book_query(&args).expect("flags should parse");
        assert_eq!(query.title.as_deref(), Some("dune"));
        assert_eq!(query.from_year, Some(1960));
        assert!(query.genre.is_none());
    }

    #[test]
    fn test_parse_book_query_rejects_unknown_flag() {
        let args: Vec<String> = vec!["--color".to_string(), "red".to_string()];
        assert!(parse_book_query(&args).is_err());
    }
}
