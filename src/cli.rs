use crate::api::{CdnUploader, MediaUploader, ProfileUpdate, PropertyQuery, RegisterRequest, RemoteApi, RestClient};
use crate::config::Config;
use crate::likes::{LikeButton, ToggleOutcome};
use crate::listing::{FixedLocation, ListingWorkflow, PublishError};
use crate::models::{Agent, ListingType, MediaItem, Property, PropertyType};
use crate::pages::{self, Section};
use crate::rating::RatingModal;
use crate::search::{filter_properties, suggestions, SearchFilter, DEFAULT_MAX_PRICE};
use crate::session::{FileStorage, SessionStorage, SessionStore};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "estate-scout", version, about = "Browse, save and publish property listings")]
pub struct Cli {
    /// Config file
    #[arg(long, default_value = "estate-scout.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Featured listings, latest listings and top agents
    Home,
    /// Filter all listings locally
    Search(SearchArgs),
    /// Location suggestions for a partial query
    Suggest { query: String },
    /// Listing details with its agent and similar listings
    Show { id: String },
    /// Agent profile and listings
    Agent {
        id: String,
        /// Rate the agent 1-5 stars
        #[arg(long)]
        rate: Option<u8>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
        /// Create an agent account
        #[arg(long)]
        agent: bool,
    },
    Logout,
    Whoami,
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
    },
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    DeleteAccount,
    /// Like or unlike a listing
    Like { id: String },
    /// Listings you have liked
    Saved,
    /// Create a listing, or edit one with --edit
    Publish(PublishArgs),
    /// Delete one of your listings
    Delete { id: String },
    /// Move a listing to its next status
    Status { id: String },
    /// Toggle featured (admin)
    Feature { id: String },
    /// Your listings, or all listings for admins
    Dashboard,
    /// Forget the saved session
    ResetCache,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(long, default_value = "")]
    pub term: String,
    #[arg(long = "type")]
    pub property_type: Option<PropertyType>,
    #[arg(long)]
    pub listing: Option<ListingType>,
    #[arg(long, default_value_t = DEFAULT_MAX_PRICE)]
    pub max_price: i64,
    /// Write matches to this JSON file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Id of a listing to edit
    #[arg(long)]
    pub edit: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long = "type")]
    pub property_type: Option<PropertyType>,
    #[arg(long)]
    pub listing: Option<ListingType>,
    #[arg(long)]
    pub bedrooms: Option<u32>,
    #[arg(long)]
    pub bathrooms: Option<u32>,
    #[arg(long)]
    pub area: Option<String>,
    #[arg(long)]
    pub plots: Option<String>,
    #[arg(long = "feature")]
    pub features: Vec<String>,
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
    #[arg(long = "video")]
    pub videos: Vec<PathBuf>,
    #[arg(long, requires = "lng")]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat")]
    pub lng: Option<f64>,
}

/// Long-lived objects shared by every command
pub struct App {
    pub session: SessionStore,
    pub storage: Arc<dyn SessionStorage>,
    uploader: Option<Arc<dyn MediaUploader>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let api: Arc<dyn RemoteApi> = Arc::new(RestClient::new(&config.api)?);
        let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(config.session.path.clone()));
        let uploader = CdnUploader::from_config(&config.cdn)?.map(|u| Arc::new(u) as Arc<dyn MediaUploader>);
        if uploader.is_none() {
            info!("No CDN configured, media will be sent inline");
        }

        Ok(Self {
            session: SessionStore::new(api, storage.clone()),
            storage,
            uploader,
        })
    }

    fn api(&self) -> Arc<dyn RemoteApi> {
        self.session.api().clone()
    }
}

pub async fn execute(app: &mut App, command: Command) -> Result<()> {
    if let Err(e) = app.session.restore().await {
        warn!("Could not restore session: {}", e);
    }

    match command {
        Command::Home => home(app).await,
        Command::Search(args) => search(app, args).await,
        Command::Suggest { query } => {
            let all = app.api().list_properties(&PropertyQuery::default()).await?;
            for s in suggestions(&all, &query) {
                println!("{}", s);
            }
            Ok(())
        }
        Command::Show { id } => show(app, &id).await,
        Command::Agent { id, rate } => agent(app, &id, rate).await,
        Command::Login { email, password } => {
            let user = app
                .session
                .login(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Signed in as {} ({:?})", user.name, user.role);
            Ok(())
        }
        Command::Register {
            name,
            email,
            password,
            phone,
            agent,
        } => {
            let request = RegisterRequest {
                name,
                email,
                password,
                as_agent: agent,
                phone,
            };
            let user = app
                .session
                .register(&request)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Welcome, {}!", user.name);
            Ok(())
        }
        Command::Logout => {
            app.session.logout().await?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.session.current_user() {
                Some(user) => {
                    println!("{} <{}> ({:?})", user.name, user.email, user.role);
                    println!("Saved properties: {}", user.saved_properties.len());
                }
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::ForgotPassword { email } => {
            app.session.forgot_password(&email).await?;
            println!("If that account exists, a reset link is on its way");
            Ok(())
        }
        Command::ResetPassword { token, password } => {
            app.session.reset_password(&token, &password).await?;
            println!("Password updated, you can sign in now");
            Ok(())
        }
        Command::Profile { name, phone, bio } => {
            let update = ProfileUpdate {
                name,
                phone,
                bio,
                avatar: None,
            };
            let user = app.session.update_profile(&update).await?;
            println!("Profile updated for {}", user.name);
            Ok(())
        }
        Command::DeleteAccount => {
            app.session.delete_account().await?;
            println!("Account deleted");
            Ok(())
        }
        Command::Like { id } => like(app, &id).await,
        Command::Saved => {
            let saved = pages::load_saved(&app.session).await?;
            print_properties(&saved);
            Ok(())
        }
        Command::Publish(args) => publish(app, args).await,
        Command::Delete { id } => {
            let property = app.api().get_property(&id).await?;
            let mut workflow = ListingWorkflow::new(None);
            workflow.delete(&app.session, &property).await.map_err(user_error)?;
            println!("Deleted {}", property.title);
            Ok(())
        }
        Command::Status { id } => {
            let property = app.api().get_property(&id).await?;
            let mut workflow = ListingWorkflow::new(None);
            let updated = workflow
                .cycle_status(&app.session, &property)
                .await
                .map_err(user_error)?;
            println!("{} is now {}", updated.title, updated.status);
            Ok(())
        }
        Command::Feature { id } => {
            let property = app.api().get_property(&id).await?;
            let mut workflow = ListingWorkflow::new(None);
            let updated = workflow
                .toggle_featured(&app.session, &property)
                .await
                .map_err(user_error)?;
            println!(
                "{} is {}",
                updated.title,
                if updated.featured { "featured" } else { "no longer featured" }
            );
            Ok(())
        }
        Command::Dashboard => {
            let listings = pages::load_dashboard(&app.session).await?;
            print_properties(&listings);
            Ok(())
        }
        Command::ResetCache => {
            app.storage.clear().await?;
            println!("Local cache cleared");
            Ok(())
        }
    }
}

fn user_error(e: PublishError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

async fn home(app: &App) -> Result<()> {
    let page = pages::load_home(app.api().as_ref()).await;

    println!("⭐ Featured");
    print_section(&page.featured, print_properties);
    println!("🆕 Latest");
    print_section(&page.latest, print_properties);
    println!("🏅 Top agents");
    print_section(&page.agents, |agents: &[Agent]| {
        for agent in agents {
            println!(
                "   {} ({}) ★ {:.1} from {} rating(s)",
                agent.name,
                agent.agency.as_deref().unwrap_or("independent"),
                agent.rating.average,
                agent.rating.count
            );
        }
    });
    Ok(())
}

fn print_section<T>(section: &Section<T>, render: impl Fn(&[T])) {
    match &section.error {
        Some(error) => println!("   ⚠️  {}", error),
        None if section.items.is_empty() => println!("   Nothing here yet"),
        None => render(&section.items),
    }
    println!();
}

async fn search(app: &App, args: SearchArgs) -> Result<()> {
    let filter = SearchFilter {
        term: args.term,
        property_type: args.property_type,
        listing_type: args.listing,
        max_price: args.max_price,
    };

    let all = app.api().list_properties(&PropertyQuery::default()).await?;
    let matches = filter_properties(&all, &filter);
    info!("✅ {} of {} properties match", matches.len(), all.len());

    let owned: Vec<Property> = matches.into_iter().cloned().collect();
    print_properties(&owned);

    if let Some(path) = args.save {
        let json = serde_json::to_string_pretty(&owned)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Saved {} properties to {}", owned.len(), path.display());
    }
    Ok(())
}

async fn show(app: &App, id: &str) -> Result<()> {
    let page = pages::load_property(&app.session, id).await?;
    let p = &page.property;

    println!("{} ({})", p.title, format_price(p.price));
    println!("   {} · {} for {}", p.property_type, p.status, p.listing_type);
    println!("   {}, {}, {}", p.location.address, p.location.city, p.location.state);
    println!("   {} bed, {} bath, {} m²", p.bedrooms, p.bathrooms, p.area);
    if let Some(plots) = p.plots {
        println!("   {} plot(s)", plots);
    }
    if !p.features.is_empty() {
        println!("   Features: {}", p.features.join(", "));
    }
    if let Some(cover) = p.cover_image() {
        println!("   Image: {}", cover);
    }
    println!("   ♥ {}{}", p.likes, if page.is_saved { " (saved)" } else { "" });
    if !p.description.is_empty() {
        println!();
        println!("{}", p.description);
    }
    println!();

    match (&page.agent, &page.agent_error) {
        (Some(agent), _) => println!(
            "Listed by {} ★ {:.1}{}",
            agent.name,
            agent.rating.average,
            if page.is_owner { " (you)" } else { "" }
        ),
        (None, Some(error)) => println!("Agent unavailable: {}", error),
        (None, None) => {}
    }
    println!();
    println!("Similar listings");
    print_section(&page.suggested, print_properties);
    Ok(())
}

async fn agent(app: &App, id: &str, rate: Option<u8>) -> Result<()> {
    let page = pages::load_agent(&app.session, id).await?;
    let agent = &page.agent;

    println!("{}", agent.name);
    if let Some(agency) = &agent.agency {
        println!("   {}", agency);
    }
    println!("   ★ {:.1} from {} rating(s)", agent.rating.average, agent.rating.count);
    if let Some(license) = &agent.license {
        println!("   License: {}", license);
    }
    if !agent.specialties.is_empty() {
        println!("   Specialties: {}", agent.specialties.join(", "));
    }
    if let Some(bio) = &agent.bio {
        println!("   {}", bio);
    }
    println!();
    print_section(&page.listings, print_properties);

    if let Some(stars) = rate {
        let mut modal = RatingModal::new(page.agent.clone());
        modal.open(&app.session)?;
        modal.set_stars(stars);
        if !modal.can_submit() {
            bail!("Pick between 1 and 5 stars");
        }
        match modal.submit(&app.session).await {
            Ok(rating) => println!("Thanks! {} now has ★ {:.1}", agent.name, rating.average),
            // The dialog stays open; failures are only logged
            Err(_) => println!("Rating was not saved, try again"),
        }
    }
    Ok(())
}

async fn like(app: &mut App, id: &str) -> Result<()> {
    let property = app.api().get_property(id).await?;
    let mut button = LikeButton::new(&property, app.session.current_user());

    match button.toggle(&mut app.session).await {
        ToggleOutcome::SignInRequired => {
            if let Some(prompt) = button.prompt() {
                println!("{}", prompt.message);
            }
        }
        ToggleOutcome::Failed => {
            println!("⚠️  {}", button.error().unwrap_or("Could not update saved properties"));
        }
        ToggleOutcome::Saved | ToggleOutcome::Removed => {
            let state = button.state();
            println!(
                "{} {} (♥ {})",
                if state.liked { "Saved" } else { "Removed" },
                property.title,
                state.count
            );
        }
    }
    Ok(())
}

async fn publish(app: &App, args: PublishArgs) -> Result<()> {
    let mut workflow = ListingWorkflow::new(app.uploader.clone());
    match &args.edit {
        Some(id) => {
            let existing = app.api().get_property(id).await?;
            workflow.start_edit(&existing);
        }
        None => workflow.start_new(),
    }

    if let Some(form) = workflow.form_mut() {
        apply_text(&mut form.title, args.title);
        apply_text(&mut form.description, args.description);
        apply_text(&mut form.price, args.price);
        apply_text(&mut form.address, args.address);
        apply_text(&mut form.city, args.city);
        apply_text(&mut form.state, args.state);
        apply_text(&mut form.area, args.area);
        apply_text(&mut form.plots, args.plots);
        if let Some(t) = args.property_type {
            form.property_type = t;
        }
        if let Some(t) = args.listing {
            form.listing_type = t;
        }
        if let Some(n) = args.bedrooms {
            form.bedrooms = n;
        }
        if let Some(n) = args.bathrooms {
            form.bathrooms = n;
        }
        if !args.features.is_empty() {
            form.features = args.features;
        }
    }

    for path in &args.images {
        let item = read_media(path).await?;
        if let Err(e) = workflow.add_image(item) {
            println!("⚠️  {}", e.user_message());
        }
    }
    for path in &args.videos {
        let item = read_media(path).await?;
        if let Err(e) = workflow.add_video(item) {
            println!("⚠️  {}", e.user_message());
        }
    }

    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        if let Some(warning) = pin_at(&mut workflow, lat, lng).await {
            println!("⚠️  {}", warning);
        }
    }

    match workflow.submit(&app.session).await {
        Ok(property) => {
            let message = workflow.toast().map(|t| t.message.clone()).unwrap_or_default();
            println!("✅ {}: {} ({})", message, property.title, property.id);
            Ok(())
        }
        Err(PublishError::Invalid(errors)) => {
            for field in errors.fields() {
                println!("   {}: {}", field, errors.get(field).unwrap_or_default());
            }
            bail!("Listing not submitted");
        }
        Err(e) if e.is_quota_exceeded() => bail!("Storage quota exceeded: {}", e.user_message()),
        Err(e) => bail!(e.user_message()),
    }
}

/// Pin the open form at `lat`/`lng`; the warning to show if that failed
async fn pin_at(workflow: &mut ListingWorkflow, lat: f64, lng: f64) -> Option<String> {
    let result = match FixedLocation::new(lat, lng) {
        Ok(here) => workflow.pin_location(&here).await.map(|_| ()),
        Err(e) => Err(e),
    };
    result.err().map(|e| format!("Location not pinned: {}", e))
}

fn apply_text(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

async fn read_media(path: &Path) -> Result<MediaItem> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(MediaItem::local(file_name, mime_for(path), &bytes))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Naira amount with thousands separators, e.g. `₦15,000,000`
fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if price < 0 { "-" } else { "" };
    format!("{}₦{}", sign, grouped)
}

pub fn print_properties(properties: &[Property]) {
    for (i, property) in properties.iter().enumerate() {
        println!("{}. {} ({})", i + 1, property.title, format_price(property.price));
        println!(
            "   {} for {}, {} bed, {} m²",
            property.property_type, property.listing_type, property.bedrooms, property.area
        );
        println!("   {}, {}", property.location.city, property.location.state);
        println!("   ID: {}", property.id);
        if !property.features.is_empty() {
            println!("   Features: {}", property.features.join(", "));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "estate-scout",
            "search",
            "--term",
            "lekki",
            "--type",
            "villa",
            "--max-price",
            "20000000",
        ])
        .unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.term, "lekki");
                assert_eq!(args.property_type, Some(PropertyType::Villa));
                assert_eq!(args.max_price, 20_000_000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_publish_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["estate-scout", "publish", "--lat", "6.4"]).is_err());
    }

    #[tokio::test]
    async fn test_pin_failures_are_reported() {
        let mut workflow = ListingWorkflow::new(None);
        assert!(pin_at(&mut workflow, 6.4, 3.4).await.is_some());

        workflow.start_new();
        let warning = pin_at(&mut workflow, 123.0, 3.4).await.unwrap();
        assert!(warning.starts_with("Location not pinned"));
        assert!(workflow.form().latitude.is_none());

        assert_eq!(pin_at(&mut workflow, 6.4, 3.4).await, None);
        assert_eq!(workflow.form().latitude, Some(6.4));
    }

    #[test]
    fn test_prices_are_naira_with_separators() {
        assert_eq!(format_price(15_000_000), "₦15,000,000");
        assert_eq!(format_price(950), "₦950");
        assert_eq!(format_price(1_000), "₦1,000");
        assert_eq!(format_price(0), "₦0");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("tour.mp4")), "video/mp4");
        assert_eq!(mime_for(Path::new("README")), "application/octet-stream");
    }
}
