//! Provisions an administrator from seeded codes, lets it issue a pair for a user, registers the
//! user, and shows the throttle at work, all against the in-memory store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use time::OffsetDateTime;
// self
use code_gate::{
	auth::{Argon2Scheme, PasswordScheme, Role},
	config::GatekeeperConfig,
	flows::{Gatekeeper, IssueCodeRequest, RegistrationRequest},
	registry::CodeSeed,
	store::MemoryStore,
};

const CONFIG: &str = r#"{
	"throttle": { "attempt_threshold": 3, "block_duration": 600 },
	"session": { "signing_secret": "demo-signing-secret-that-is-long-enough" }
}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = Arc::new(MemoryStore::default());
	let scheme: Arc<dyn PasswordScheme> = Arc::new(Argon2Scheme::default());
	let gatekeeper =
		Gatekeeper::new(GatekeeperConfig::from_json_str(CONFIG)?, store.clone(), store, scheme)?;
	let now = OffsetDateTime::now_utc();
	let seed = CodeSeed::new("ROOT-A", "ROOT-B", Role::Admin).with_issued_by("bootstrap");
	let seeded = gatekeeper.seed_codes([seed], now).await?;

	println!("seeded {} admin pair(s), skipped {}", seeded.created, seeded.skipped);

	gatekeeper
		.register(RegistrationRequest::new("root", "rootpass", "ROOT-A", "ROOT-B"), now)
		.await?;

	let admin = gatekeeper.login("root", "rootpass", now).await?;
	let code = gatekeeper
		.issue_code(&admin.token, IssueCodeRequest::new("AAA111", "BBB222", Role::User), now)
		.await?;

	println!("root issued a {} pair", code.intended_role);

	let alice = gatekeeper
		.register(RegistrationRequest::new("alice", "secret1", "AAA111", "BBB222"), now)
		.await?;

	println!("registered {} as {}", alice.username, alice.role);

	for _ in 0..3 {
		if let Err(e) = gatekeeper.login("alice", "wrong-pass", now).await {
			println!("login refused: {e} (HTTP {})", e.http_status());
		}
	}

	for summary in gatekeeper.list_accounts(&admin.token, now).await? {
		println!(
			"{:<8} role={:<5} status={:<8} blocked_until={:?}",
			summary.username.as_str(),
			summary.role,
			summary.status,
			summary.blocked_until,
		);
	}

	let stats = gatekeeper.code_stats(&admin.token, now).await?;

	println!("codes: {} issued, {} available", stats.total, stats.available);

	Ok(())
}
