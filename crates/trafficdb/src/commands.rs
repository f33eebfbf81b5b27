use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::Subcommand;
use tokio::net::TcpListener;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};
use trafficdb_core::{Catalog, CrudEngine, SqlExecutor};

use crate::args::{CreateArgs, DeleteArgs, InitSchemaArgs, ServerArgs, TableArgs, UpdateArgs};

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the traffic database over HTTP.
    Server(ServerArgs),
    /// List the supported tables.
    Tables,
    /// Print a table's columns as reported by the database.
    Columns(TableArgs),
    /// Print every row of a table as JSON.
    Read(TableArgs),
    /// Print the number of rows in a table.
    Count(TableArgs),
    /// Insert a row and print whether it succeeded.
    Create(CreateArgs),
    /// Update the row with the given key and print whether it succeeded.
    Update(UpdateArgs),
    /// Delete the row with the given key and print whether it succeeded.
    Delete(DeleteArgs),
    /// Create the traffic tables if they don't exist.
    InitSchema(InitSchemaArgs),
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Server(server) => server.run(),
            Commands::Tables => list_tables(),
            Commands::Columns(args) => TableCommand::Columns.run(args),
            Commands::Read(args) => TableCommand::Read.run(args),
            Commands::Count(args) => TableCommand::Count.run(args),
            Commands::Create(args) => args.run(),
            Commands::Update(args) => args.run(),
            Commands::Delete(args) => args.run(),
            Commands::InitSchema(args) => args.run(),
        }
    }
}

trait RunCommand {
    fn run(self) -> Result<()>;
}

impl RunCommand for ServerArgs {
    fn run(self) -> Result<()> {
        let runtime = build_runtime("server")?;
        runtime.block_on(async move {
            let config = self.db.config()?;
            let executor = if self.init_schema {
                config.connect_and_bootstrap().await?
            } else {
                config.connect().await?
            };

            let listener = TcpListener::bind(&self.bind).await?;
            println!("Serving trafficdb on http://{}", listener.local_addr()?);

            serve_and_close(listener, executor, shutdown_signal()).await
        })
    }
}

impl RunCommand for InitSchemaArgs {
    fn run(self) -> Result<()> {
        let runtime = build_runtime("init")?;
        runtime.block_on(async move {
            let executor = self.db.config()?.connect_and_bootstrap().await?;
            close_executor(executor.as_ref()).await;
            println!("Traffic schema is ready");
            Ok(())
        })
    }
}

impl RunCommand for CreateArgs {
    fn run(self) -> Result<()> {
        let values = self.payload()?;
        let runtime = build_runtime("cli")?;
        runtime.block_on(async move {
            let executor = self.db.config()?.connect().await?;
            let engine = CrudEngine::traffic(executor.clone());

            let created = engine.create(&self.table, &values).await;
            close_executor(executor.as_ref()).await;
            print_success(created?)
        })
    }
}

impl RunCommand for UpdateArgs {
    fn run(self) -> Result<()> {
        let key = self.key_values()?;
        let values = self.payload()?;
        let runtime = build_runtime("cli")?;
        runtime.block_on(async move {
            let executor = self.db.config()?.connect().await?;
            let engine = CrudEngine::traffic(executor.clone());

            let updated = engine.update(&self.table, &key, &values).await;
            close_executor(executor.as_ref()).await;
            print_success(updated?)
        })
    }
}

impl RunCommand for DeleteArgs {
    fn run(self) -> Result<()> {
        let key = self.key_values()?;
        let runtime = build_runtime("cli")?;
        runtime.block_on(async move {
            let executor = self.db.config()?.connect().await?;
            let engine = CrudEngine::traffic(executor.clone());

            let deleted = engine.delete(&self.table, &key).await;
            close_executor(executor.as_ref()).await;
            print_success(deleted?)
        })
    }
}

/// Serve until `shutdown` resolves, then close the database connection.
///
/// The connection is closed whether or not serving failed.
async fn serve_and_close(
    listener: TcpListener,
    executor: Arc<dyn SqlExecutor>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let engine = CrudEngine::traffic(executor.clone());
    let served = trafficdb_http::serve(listener, engine, shutdown).await;
    close_executor(executor.as_ref()).await;
    served?;
    Ok(())
}

fn print_success(success: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{success}")?;
    Ok(())
}

/// One-shot commands against a single table.
#[derive(Debug, Clone, Copy)]
enum TableCommand {
    Columns,
    Read,
    Count,
}

impl TableCommand {
    fn run(self, args: TableArgs) -> Result<()> {
        let runtime = build_runtime("cli")?;
        runtime.block_on(async move {
            let executor = args.db.config()?.connect().await?;
            let engine = CrudEngine::traffic(executor.clone());

            let output = self.render(&engine, &args.table).await;
            close_executor(executor.as_ref()).await;
            let output = output?;

            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{output}")?;
            Ok(())
        })
    }

    async fn render(self, engine: &CrudEngine, table: &str) -> Result<String> {
        Ok(match self {
            TableCommand::Columns => serde_json::to_string_pretty(&engine.columns_for(table).await?)?,
            TableCommand::Read => serde_json::to_string_pretty(&engine.read(table).await?)?,
            TableCommand::Count => engine.count(table).await?.to_string(),
        })
    }
}

fn list_tables() -> Result<()> {
    let catalog = Catalog::traffic();
    let mut stdout = io::stdout().lock();
    for table in catalog.table_names() {
        writeln!(stdout, "{table}")?;
    }
    Ok(())
}

async fn close_executor(executor: &dyn SqlExecutor) {
    if let Err(e) = executor.close().await {
        warn!(error = %e.driver_message(), "failed to close database connection");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => warn!(%e, "unable to listen for shutdown signal"),
    }
}

fn build_runtime(thread_label: &'static str) -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .thread_name_fn(move || {
            static THREAD_ID: AtomicU64 = AtomicU64::new(0);
            let id = THREAD_ID.fetch_add(1, Ordering::Relaxed);
            format!("{}-thread-{}", thread_label, id)
        })
        .enable_all()
        .build()?;

    Ok(runtime)
}
