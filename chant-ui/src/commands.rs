//! Command-line screens
//!
//! Each subcommand plays the part of one screen of the chant client: it
//! collects input, drives a [`FlowController`], and prints the resulting
//! notices. Returns `Ok(false)` when the screen ended on an error notice.

use anyhow::Result;
use chant_common::config::NetworkFailurePolicy;
use chant_common::{identifier, normalize};
use clap::{Args, Subcommand};
use std::io::Write;
use std::sync::Arc;

use crate::flow::{ChantForm, FlowController, FlowError, Mode, Notice, NoticeLevel, SubMode};
use crate::gateway::ChantGateway;

/// How the user identifies on the command line
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// 10-digit phone number
    #[arg(long, conflicts_with = "username")]
    pub phone: Option<String>,

    /// Username (at least 8 letters or digits)
    #[arg(long)]
    pub username: Option<String>,

    /// Claim the username as a new user instead of continuing an existing one
    #[arg(long, requires = "username")]
    pub new: bool,
}

impl IdentityArgs {
    /// Mode, sub-mode and raw identifier, if one was given
    pub fn selection(&self) -> Option<(Mode, Option<SubMode>, &str)> {
        if let Some(phone) = &self.phone {
            return Some((Mode::Phone, None, phone));
        }
        let username = self.username.as_deref()?;
        let sub_mode = if self.new { SubMode::New } else { SubMode::Existing };
        Some((Mode::Username, Some(sub_mode), username))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScreenCommand {
    /// Add a chant count for a day
    Add {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Number of chants (at least 1)
        #[arg(short, long)]
        count: String,

        /// Day the chants were done (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Verify an identifier and show its total
    Verify {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Claim a new username
    CreateUsername {
        username: String,

        /// Repeat the username
        #[arg(long)]
        confirm: String,
    },

    /// Show totals for a user and for everyone
    Stats {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// List per-user totals, highest first
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

fn print_notice(out: &mut dyn Write, notice: &Notice) -> Result<()> {
    let mark = match notice.level {
        NoticeLevel::Success => "✓",
        NoticeLevel::Error => "✗",
    };
    writeln!(out, "{} {}", mark, notice)?;
    Ok(())
}

fn report(out: &mut dyn Write, result: std::result::Result<Notice, FlowError>) -> Result<bool> {
    match result {
        Ok(notice) => {
            print_notice(out, &notice)?;
            Ok(true)
        }
        Err(e) => {
            print_notice(out, &e.notice())?;
            Ok(false)
        }
    }
}

fn print_totals<G: ChantGateway>(
    out: &mut dyn Write,
    controller: &FlowController<G>,
) -> Result<()> {
    if let Some(stats) = controller.user_stats() {
        writeln!(out, "Your total count: {}", stats.total_count)?;
    }
    match controller.global_total() {
        Some(total) => writeln!(out, "Total chants (all users): {}", total)?,
        None => writeln!(out, "Total chants (all users): unavailable")?,
    }
    Ok(())
}

/// Run one screen against `gateway`
pub async fn run<G: ChantGateway>(
    command: ScreenCommand,
    gateway: Arc<G>,
    policy: NetworkFailurePolicy,
    out: &mut dyn Write,
) -> Result<bool> {
    let mut controller = FlowController::new(Arc::clone(&gateway), policy);

    match command {
        ScreenCommand::Add {
            identity,
            count,
            date,
        } => {
            let Some((mode, sub_mode, raw_id)) = identity.selection() else {
                anyhow::bail!("Either --phone or --username is required");
            };
            controller.select_mode(mode, sub_mode);

            if controller.state().requires_verification() {
                let verified = controller.verify(raw_id).await;
                let ok = report(out, verified)?;
                if !ok {
                    return Ok(false);
                }
            }

            let mut form = ChantForm::new(raw_id, count).with_date(date.unwrap_or_default());
            let submitted = controller.submit(&mut form).await;
            let ok = report(out, submitted)?;
            if ok {
                print_totals(out, &controller)?;
            }
            Ok(ok)
        }

        ScreenCommand::Verify { identity } => {
            let Some((mode, sub_mode, raw_id)) = identity.selection() else {
                anyhow::bail!("Either --phone or --username is required");
            };
            controller.select_mode(mode, sub_mode);
            let verified = controller.verify(raw_id).await;
            report(out, verified)
        }

        ScreenCommand::CreateUsername { username, confirm } => {
            let created = controller.create_username(&username, &confirm).await;
            let ok = report(out, created)?;
            if ok {
                writeln!(
                    out,
                    "Add chants with: chant-ui add --username {} --count <N>",
                    normalize(&username)
                )?;
            }
            Ok(ok)
        }

        ScreenCommand::Stats { identity } => {
            if let Some((mode, sub_mode, raw_id)) = identity.selection() {
                controller.select_mode(mode, sub_mode);
                let raw_id = match identifier::validate(raw_id, mode) {
                    Ok(raw_id) => raw_id,
                    Err(e) => {
                        print_notice(out, &FlowError::from(e).notice())?;
                        return Ok(false);
                    }
                };
                let userid = normalize(raw_id);
                if controller.refresh_stats(&userid).await.is_none() {
                    writeln!(out, "No totals found for {}", userid)?;
                }
            }
            controller.refresh_global_total().await;
            print_totals(out, &controller)?;
            Ok(true)
        }

        ScreenCommand::Leaderboard { limit } => match gateway.user_counts().await {
            Ok(mut counts) => {
                counts.sort_by(|a, b| {
                    b.total_chants
                        .cmp(&a.total_chants)
                        .then_with(|| a.user_id.cmp(&b.user_id))
                });
                for (rank, entry) in counts.iter().take(limit).enumerate() {
                    writeln!(out, "{:>3}. {:<20} {}", rank + 1, entry.user_id, entry.total_chants)?;
                }
                if counts.is_empty() {
                    writeln!(out, "No chants recorded yet")?;
                }
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load per-user totals");
                print_notice(out, &Notice::error("Could not load per-user totals"))?;
                Ok(false)
            }
        },
    }
}
