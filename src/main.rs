//! Pooled Inbox server.
//!
//! Loads configuration, wires adapters behind the ports, starts the mail
//! route actor and the background loops, then serves HTTP until Ctrl-C.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use pooled_inbox::adapters::email::{MailTemplate, ResendConfig, ResendMailer};
use pooled_inbox::adapters::http::{api_router, AppState, HttpSettings};
use pooled_inbox::adapters::memory::{
    InMemoryAccountStore, InMemoryMailRouteStore, InMemoryOrderRepository,
    InMemoryProcessedEventStore, RecordingMailer,
};
use pooled_inbox::adapters::postgres::{
    PostgresAccountStore, PostgresMailRouteStore, PostgresOrderRepository,
    PostgresProcessedEventStore,
};
use pooled_inbox::adapters::stripe::{MockPaymentProvider, StripeConfig, StripePaymentAdapter};
use pooled_inbox::adapters::{ChangeFeedPoller, ChangeFeedPollerConfig, PeriodicWorker};
use pooled_inbox::application::{
    AccountChangeProcessor, AccountProvisioner, CheckoutSettings, CreateOrderHandler,
    ExpiryReaper, MailRouteSync, NotificationDispatcher, NotificationSettings,
    PaymentWebhookProcessor, ReconciliationSweep, UnsubscribeService,
};
use pooled_inbox::config::{AppConfig, DatabaseConfig, MailConfig, PaymentConfig};
use pooled_inbox::domain::payment::WebhookVerifier;
use pooled_inbox::ports::{
    AccountRepository, BulkMailer, ChangeFeed, MailRouteStore, OrderRepository, PaymentProvider,
    ProcessedEventStore,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage ports, backed either by PostgreSQL or by process memory.
struct Storage {
    orders: Arc<dyn OrderRepository>,
    accounts: Arc<dyn AccountRepository>,
    changes: Arc<dyn ChangeFeed>,
    routes: Arc<dyn MailRouteStore>,
    ledger: Arc<dyn ProcessedEventStore>,
}

async fn storage(database: Option<&DatabaseConfig>) -> Result<Storage, BoxError> {
    let Some(database) = database else {
        tracing::warn!("No database configured, using in-memory storage");
        let accounts = Arc::new(InMemoryAccountStore::new());
        return Ok(Storage {
            orders: Arc::new(InMemoryOrderRepository::new()),
            accounts: accounts.clone(),
            changes: accounts,
            routes: Arc::new(InMemoryMailRouteStore::new()),
            ledger: Arc::new(InMemoryProcessedEventStore::new()),
        });
    };

    let pool = database.pool_options().connect(&database.url).await?;
    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let accounts = Arc::new(PostgresAccountStore::new(pool.clone()));
    Ok(Storage {
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        accounts: accounts.clone(),
        changes: accounts,
        routes: Arc::new(PostgresMailRouteStore::new(pool.clone())),
        ledger: Arc::new(PostgresProcessedEventStore::new(pool)),
    })
}

fn payment_provider(config: &PaymentConfig) -> Arc<dyn PaymentProvider> {
    match &config.stripe_api_key {
        Some(key) => Arc::new(StripePaymentAdapter::new(
            StripeConfig::new(key.clone()).with_base_url(config.api_base_url.as_str()),
        )),
        None => {
            tracing::warn!("No Stripe key configured, using mock checkout sessions");
            Arc::new(MockPaymentProvider::new())
        }
    }
}

fn mailer(config: &MailConfig) -> Arc<dyn BulkMailer> {
    match &config.resend_api_key {
        Some(key) => {
            let mut templates = HashMap::new();
            templates.insert(
                config.intro_template.clone(),
                MailTemplate {
                    subject: config.intro_subject.clone(),
                    html: config.intro_html.clone(),
                },
            );
            Arc::new(ResendMailer::new(
                ResendConfig::new(key.clone()).with_base_url(config.resend_base_url.as_str()),
                templates,
            ))
        }
        None => {
            tracing::warn!("No Resend key configured, intro mail is only logged");
            Arc::new(RecordingMailer::new())
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let storage = storage(config.database.as_ref()).await?;
    let domain = config.mail.mail_domain();
    let workers = &config.workers;

    let (routes, route_task) = MailRouteSync::spawn(
        storage.routes.clone(),
        config.mail.mail_rule(),
        workers.route_conflict_retries,
        workers.route_queue_capacity,
    );

    let provisioner = AccountProvisioner::new(storage.orders.clone(), storage.accounts.clone());
    let notifications = Arc::new(NotificationDispatcher::new(
        mailer(&config.mail),
        storage.ledger.clone(),
        NotificationSettings {
            domain: domain.clone(),
            sender: config.mail.sender.clone(),
            template: config.mail.intro_template.clone(),
        },
    ));

    let state = AppState {
        create_order: Arc::new(CreateOrderHandler::new(
            storage.orders.clone(),
            payment_provider(&config.payment),
            config.pricing.pricing(),
            CheckoutSettings {
                domain: domain.clone(),
                success_url: config.payment.success_url.clone(),
                cancel_url: config.payment.cancel_url.clone(),
            },
        )),
        payment_webhook: Arc::new(
            PaymentWebhookProcessor::new(
                WebhookVerifier::new(config.payment.stripe_webhook_secret.clone()),
                storage.orders.clone(),
                provisioner.clone(),
            )
            .with_require_livemode(config.payment.require_livemode),
        ),
        unsubscribe: Arc::new(UnsubscribeService::new(
            storage.accounts.clone(),
            routes.clone(),
            domain.clone(),
        )),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = ChangeFeedPoller::with_config(
        storage.changes.clone(),
        Arc::new(AccountChangeProcessor::new(
            routes.clone(),
            notifications,
            domain.clone(),
        )),
        ChangeFeedPollerConfig::default()
            .with_poll_interval(workers.change_feed_interval())
            .with_batch_size(workers.change_feed_batch_size),
    );
    let sweeper = PeriodicWorker::new(
        Arc::new(ReconciliationSweep::new(
            storage.orders.clone(),
            storage.accounts.clone(),
            provisioner,
            routes.clone(),
            domain,
            workers.reconcile_batch_size,
        )),
        workers.reconcile_interval(),
    );
    let reaper = PeriodicWorker::new(
        Arc::new(ExpiryReaper::new(
            storage.accounts.clone(),
            workers.reconcile_batch_size,
        )),
        workers.reaper_interval(),
    );
    drop(routes);

    let background = vec![
        tokio::spawn({
            let rx = shutdown_rx.clone();
            async move { poller.run(rx).await }
        }),
        tokio::spawn({
            let rx = shutdown_rx.clone();
            async move { sweeper.run(rx).await }
        }),
        tokio::spawn(async move { reaper.run(shutdown_rx).await }),
    ];

    let settings = HttpSettings {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Pooled Inbox listening");

    axum::serve(listener, api_router(state, &settings))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for task in futures::future::join_all(background).await {
        if let Err(e) = task {
            tracing::error!(error = %e, "Background worker panicked");
        }
    }

    // Every handle is gone once the workers and router are dropped.
    if let Err(e) = route_task.await {
        tracing::error!(error = %e, "Mail route actor panicked");
    }
    tracing::info!("Pooled Inbox stopped");
    Ok(())
}
