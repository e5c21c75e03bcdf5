use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use diesel::{Connection, PgConnection};
use foodgram_core::catalog::{self, TagInput};
use foodgram_core::pagination::PageParams;
use foodgram_core::recipes::{self, RecipeFilter};
use foodgram_core::users::{self, RegisterUser};
use foodgram_core::{db, http, shopping_list, subscriptions, Actor, Config, Store};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "foodgram")]
#[command(about = "Foodgram operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the OpenAPI component schemas
    Openapi,
    /// Apply pending database migrations
    Migrate,
    #[command(flatten)]
    Db(DbCommands),
}

/// Commands that run against the migrated database.
#[derive(Subcommand)]
enum DbCommands {
    /// Register a user
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Grant administrative rights
        #[arg(long)]
        staff: bool,
    },
    /// Create a tag (requires a staff user)
    CreateTag {
        /// Id of the staff user performing the change
        #[arg(long = "as-user")]
        as_user: i32,
        #[arg(long)]
        name: String,
        /// Hex color, e.g. #E26C2D
        #[arg(long)]
        color: String,
        #[arg(long)]
        slug: String,
    },
    /// Import ingredients from a JSON file of {name, measurement_unit} objects
    ImportIngredients {
        /// Path to the JSON file
        path: PathBuf,
    },
    /// List recipes as JSON
    Recipes {
        /// View as this user id (anonymous when omitted)
        #[arg(long = "as-user")]
        as_user: Option<i32>,
        /// Only recipes by this author id
        #[arg(long)]
        author: Option<i32>,
        /// Tag slug; repeat to match any of several
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        favorited: bool,
        #[arg(long)]
        in_cart: bool,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// List followed authors with their newest recipes as JSON
    Subscriptions {
        #[arg(long = "as-user")]
        as_user: i32,
        /// Recipes shown per author
        #[arg(long)]
        recipes_limit: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Write a user's aggregated shopping list
    ShoppingList {
        #[arg(long = "as-user")]
        as_user: i32,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Openapi => {
            println!("{}", http::openapi().to_pretty_json()?);
        }
        Commands::Migrate => {
            let config = Config::from_env()?;
            let mut conn = PgConnection::establish(&config.database_url)
                .context("Failed to connect to database")?;
            let applied = db::run_migrations(&mut conn)?;
            println!("Applied {} pending migrations", applied);
        }
        Commands::Db(command) => {
            let config = Config::from_env()?;
            let pool =
                db::create_pool(&config.database_url).context("Failed to open database")?;
            let mut conn = pool.get().context("Failed to get DB connection")?;
            run(command, &config, &mut conn)?;
        }
    }

    Ok(())
}

fn run(command: DbCommands, config: &Config, conn: &mut PgConnection) -> Result<()> {
    match command {
        DbCommands::CreateUser {
            email,
            username,
            first_name,
            last_name,
            staff,
        } => {
            let input = RegisterUser {
                email,
                username,
                first_name,
                last_name,
            };
            let profile = if staff {
                users::register_staff_user(conn, &input)?
            } else {
                users::register_user(conn, &input)?
            };
            print_json(&profile)?;
        }
        DbCommands::CreateTag {
            as_user,
            name,
            color,
            slug,
        } => {
            let actor = resolve_actor(conn, Some(as_user))?;
            let tag = catalog::create_tag(conn, &actor, &TagInput { name, color, slug })?;
            print_json(&tag)?;
        }
        DbCommands::ImportIngredients { path } => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let inserted = catalog::import_ingredients(conn, file)?;
            println!("Imported {} new ingredients", inserted);
        }
        DbCommands::Recipes {
            as_user,
            author,
            tags,
            favorited,
            in_cart,
            limit,
            offset,
        } => {
            let actor = resolve_actor(conn, as_user)?;
            let filter = RecipeFilter {
                author,
                tags,
                is_favorited: favorited,
                is_in_shopping_cart: in_cart,
            };
            let page = PageParams::new(limit, offset).resolve(config.page_size);
            print_json(&recipes::list_recipes(conn, &actor, &filter, page)?)?;
        }
        DbCommands::Subscriptions {
            as_user,
            recipes_limit,
            limit,
            offset,
        } => {
            let actor = resolve_actor(conn, Some(as_user))?;
            let page = PageParams::new(limit, offset).resolve(config.page_size);
            let per_author = subscriptions::recipes_limit(recipes_limit, config.feed_recipes_limit);
            print_json(&subscriptions::subscriptions(conn, &actor, page, per_author)?)?;
        }
        DbCommands::ShoppingList { as_user, output } => {
            let actor = resolve_actor(conn, Some(as_user))?;
            let file = shopping_list::export_shopping_list(conn, &actor)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &file.content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", file.content),
            }
        }
    }

    Ok(())
}

/// Looks up the acting user so staff rights come from the database.
fn resolve_actor(conn: &mut PgConnection, user_id: Option<i32>) -> Result<Actor> {
    let Some(id) = user_id else {
        return Ok(Actor::Anonymous);
    };
    match conn.find_user(id)? {
        Some(user) => Ok(Actor::from(&user)),
        None => bail!("User {} does not exist", id),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
