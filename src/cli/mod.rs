// cli/mod.rs — command implementations behind the `comet` binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::api::ApiError;
use crate::cooldown::Cooldown;
use crate::model::BootstrapResult;
use crate::AppContext;

/// Minimum gap between loot rolls from this client.
const ROLL_COOLDOWN: Duration = Duration::from_secs(30);

const LOOT_ROLLED_AT_KEY: &str = "loot_rolled_at";

// ─── Session helpers ─────────────────────────────────────────────────────────

/// Restore the stored session or bail with a hint.
async fn require_session(ctx: &AppContext) -> Result<()> {
    if !ctx.auth.resume().await? {
        bail!("not connected — run `comet connect <license-key>` first");
    }
    Ok(())
}

/// Surface an operation result, routing the fixed session-expired sentence
/// through the recovery flow instead of a generic error.
async fn surface<T>(ctx: &AppContext, result: std::result::Result<T, ApiError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if ctx.auth.handle_session_expired(&e.message()).await {
                bail!("the panel session has lapsed — sign in again with `comet connect`");
            }
            Err(e.into())
        }
    }
}

/// Load the full member record into state (the resume probe is minimal and
/// carries no script/project lists).
async fn load_member(ctx: &AppContext) -> Result<()> {
    let member = surface(ctx, ctx.client.get_member().await).await?;
    ctx.state.set_member_if_current(ctx.state.epoch(), member);
    Ok(())
}

// ─── Commands ────────────────────────────────────────────────────────────────

pub async fn cmd_connect(ctx: &AppContext, key: &str, remember: bool) -> Result<()> {
    ctx.auth
        .login(key, remember)
        .await
        .context("login failed")?;
    let result = ctx.bootstrapper.bootstrap().await?;
    print_summary(&result);
    Ok(())
}

pub async fn cmd_status(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;
    let result = ctx.bootstrapper.bootstrap().await?;
    print_summary(&result);
    Ok(())
}

pub async fn cmd_scripts_list(ctx: &AppContext, all: bool) -> Result<()> {
    require_session(ctx).await?;
    if all {
        let scripts = surface(ctx, ctx.client.get_all_scripts().await).await?;
        for s in &scripts {
            println!("{:>6}  {}  (by {})", s.id, s.name, s.author);
        }
        println!("{} scripts in the catalog", scripts.len());
    } else {
        load_member(ctx).await?;
        let member = ctx.state.member().unwrap_or_default();
        for s in &member.scripts {
            println!("{:>6}  {}", s.id, s.name);
        }
        println!("{} scripts enabled", member.scripts.len());
    }
    Ok(())
}

pub async fn cmd_scripts_toggle(ctx: &AppContext, ids: &[i64]) -> Result<()> {
    require_session(ctx).await?;
    load_member(ctx).await?;

    // Names from the catalog so optimistic enables carry a label.
    let catalog = ctx.client.get_all_scripts().await.unwrap_or_default();
    let name_of = |id: i64| {
        catalog
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("script {id}"))
    };

    let mut toggler = ctx.toggler();
    for &id in ids {
        match toggler.toggle_script(id, &name_of(id)).await {
            Ok(true) => println!("enabled  {}", name_of(id)),
            Ok(false) => println!("disabled {}", name_of(id)),
            Err(e) => eprintln!("failed to toggle {id}: {e}"),
        }
    }
    toggler.settle().await;
    Ok(())
}

pub async fn cmd_projects_list(ctx: &AppContext, all: bool) -> Result<()> {
    require_session(ctx).await?;
    if all {
        let projects = surface(ctx, ctx.client.get_fc2t_projects().await).await?;
        for p in &projects {
            println!("{:>6}  {}  (by {})", p.id, p.name, p.author);
        }
        println!("{} projects in the catalog", projects.len());
    } else {
        load_member(ctx).await?;
        let member = ctx.state.member().unwrap_or_default();
        for p in &member.projects {
            println!("{:>6}  {}", p.id, p.name);
        }
        println!("{} projects enabled", member.projects.len());
    }
    Ok(())
}

pub async fn cmd_projects_toggle(ctx: &AppContext, ids: &[i64]) -> Result<()> {
    require_session(ctx).await?;
    load_member(ctx).await?;

    let catalog = ctx.client.get_fc2t_projects().await.unwrap_or_default();
    let name_of = |id: i64| {
        catalog
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("project {id}"))
    };

    let mut toggler = ctx.toggler();
    for &id in ids {
        match toggler.toggle_project(id, &name_of(id)).await {
            Ok(true) => println!("enabled  {}", name_of(id)),
            Ok(false) => println!("disabled {}", name_of(id)),
            Err(e) => eprintln!("failed to toggle {id}: {e}"),
        }
    }
    toggler.settle().await;
    Ok(())
}

pub async fn cmd_config_show(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;
    let config = surface(ctx, ctx.client.get_configuration().await).await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub async fn cmd_config_set(ctx: &AppContext, file: &PathBuf) -> Result<()> {
    require_session(ctx).await?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    // Validate locally before shipping a broken blob.
    serde_json::from_str::<serde_json::Value>(&text)
        .context("configuration file is not valid JSON")?;
    surface(ctx, ctx.client.set_configuration(&text).await).await?;
    println!("configuration updated");
    Ok(())
}

pub async fn cmd_config_reset(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;
    surface(ctx, ctx.client.reset_configuration().await).await?;
    println!("configuration reset");
    Ok(())
}

pub async fn cmd_builds_list(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;
    let builds = crate::bootstrap::load_builds_with_retry(&ctx.client).await;
    if builds.is_empty() {
        println!("no builds available");
        return Ok(());
    }
    for b in &builds {
        println!(
            "{}  (by {}) — {} scripts, {} projects{}",
            b.name,
            b.author,
            b.scripts.len(),
            b.projects.len(),
            if b.configuration.is_some() {
                ", with configuration"
            } else {
                ""
            }
        );
    }
    Ok(())
}

/// Apply a build: replace the member's script and project selections in one
/// step, plus its configuration override when present.
pub async fn cmd_builds_apply(ctx: &AppContext, name: &str) -> Result<()> {
    require_session(ctx).await?;
    let builds = crate::bootstrap::load_builds_with_retry(&ctx.client).await;
    let Some(build) = builds.iter().find(|b| b.name == name) else {
        bail!("no build named {name:?}");
    };
    surface(ctx, ctx.client.set_member_scripts(&build.scripts).await).await?;
    surface(ctx, ctx.client.set_member_projects(&build.projects).await).await?;
    if let Some(configuration) = &build.configuration {
        surface(ctx, ctx.client.set_configuration(configuration).await).await?;
    }
    println!("applied build {name}");
    Ok(())
}

pub async fn cmd_builds_create(
    ctx: &AppContext,
    name: &str,
    scripts: &[i64],
    projects: &[i64],
    config_file: Option<&PathBuf>,
) -> Result<()> {
    require_session(ctx).await?;
    let configuration = match config_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };
    surface(
        ctx,
        ctx.client
            .create_build(name, scripts, projects, configuration.as_deref())
            .await,
    )
    .await?;
    println!("created build {name}");
    Ok(())
}

pub async fn cmd_builds_delete(ctx: &AppContext, name: &str) -> Result<()> {
    require_session(ctx).await?;
    surface(ctx, ctx.client.delete_build(name).await).await?;
    println!("deleted build {name}");
    Ok(())
}

pub async fn cmd_cache(ctx: &AppContext, enabled: Option<bool>) -> Result<()> {
    match enabled {
        Some(enabled) => {
            ctx.drafts.set_caching_enabled(enabled)?;
            println!("caching {}", if enabled { "enabled" } else { "disabled" });
        }
        None => println!(
            "caching is {}",
            if ctx.drafts.caching_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        ),
    }
    Ok(())
}

pub async fn cmd_script_pull(ctx: &AppContext, id: i64, out: Option<PathBuf>) -> Result<()> {
    require_session(ctx).await?;
    ctx.drafts.purge_expired();

    if let Some(draft) = ctx.drafts.load_draft(id) {
        println!(
            "note: a local draft from {} exists; showing the server copy",
            draft.saved_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    let source = surface(ctx, ctx.client.get_script(id).await).await?;
    match out {
        Some(path) => {
            std::fs::write(&path, &source.script)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {} to {}", source.name, path.display());
        }
        None => println!("{}", source.script),
    }
    Ok(())
}

pub async fn cmd_script_push(
    ctx: &AppContext,
    id: i64,
    file: &PathBuf,
    notes: &str,
) -> Result<()> {
    require_session(ctx).await?;
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    // Draft first: if the upload dies the work is recoverable for 24 hours.
    ctx.drafts.save_draft(id, &source)?;
    surface(ctx, ctx.client.update_script(id, &source, notes).await).await?;
    ctx.drafts.delete_draft(id);
    println!("script {id} updated");
    Ok(())
}

pub async fn cmd_loot(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;

    let store = ctx.store.local_store();
    if let Some(cooldown) = read_roll_cooldown(&store) {
        if !cooldown.ready() {
            bail!(
                "loot roll on cooldown — {}s remaining",
                cooldown.remaining().as_secs().max(1)
            );
        }
    }

    let rolled = surface(ctx, ctx.client.roll_loot().await).await?;
    let _ = store.set(LOOT_ROLLED_AT_KEY, serde_json::to_value(Utc::now())?);
    match rolled.as_str() {
        Some(text) => println!("{text}"),
        None => println!("{}", serde_json::to_string_pretty(&rolled)?),
    }
    Ok(())
}

pub async fn cmd_language(ctx: &AppContext, language: &str) -> Result<()> {
    require_session(ctx).await?;
    surface(ctx, ctx.client.set_language(language).await).await?;
    println!("language set to {language}");
    Ok(())
}

pub async fn cmd_protection(ctx: &AppContext, mode: i64) -> Result<()> {
    require_session(ctx).await?;
    surface(ctx, ctx.client.set_protection(mode).await).await?;
    println!("protection mode set to {mode}");
    Ok(())
}

pub async fn cmd_venus(ctx: &AppContext) -> Result<()> {
    require_session(ctx).await?;
    surface(ctx, ctx.client.change_venus().await).await?;
    println!("Venus status changed");
    Ok(())
}

pub async fn cmd_logout(ctx: &AppContext) -> Result<()> {
    ctx.auth.logout().await;
    println!("disconnected");
    Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_summary(result: &BootstrapResult) {
    if let Some(member) = &result.member {
        println!("\n{} — level {}, {} xp", member.username, member.level, member.xp);
        println!("  scripts enabled:  {}", member.scripts.len());
        println!("  projects enabled: {}", member.projects.len());
        println!("  perks owned:      {}", member.perks.len());
        println!("  protection mode:  {}", member.protection);
    } else {
        println!("\nconnected (degraded — member record unavailable)");
    }
    println!("  script catalog:   {}", result.scripts.len());
    println!("  project catalog:  {}", result.projects.len());
    println!("  builds available: {}", result.builds.len());
    println!("  software version: {}", result.software.version);
    if result.degraded {
        println!("  note: some data failed to load; showing a minimal view");
    }
}

fn read_roll_cooldown(store: &crate::session::store::LocalStore) -> Option<Cooldown> {
    let rolled_at: DateTime<Utc> = serde_json::from_value(store.get(LOOT_ROLLED_AT_KEY)?).ok()?;
    let elapsed = (Utc::now() - rolled_at).to_std().ok()?;
    Some(Cooldown::resumed(ROLL_COOLDOWN, elapsed))
}
