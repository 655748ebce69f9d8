//! Demo activators run by the `anvil` binary.
//!
//! `HttpServer` depends on `Cache`, which depends on `Database`. Each reads its
//! settings from its own domain, so a fresh config folder ends up with
//! `database.config`, `cache.config` and `http.config` holding the defaults.

use anvil::prelude::*;
use tracing::info;

/// Registers the demo activators; returns how many were added.
///
/// # Errors
/// [`AnvilError::Store`] if a domain cannot be loaded.
pub fn register(anvil: &mut Anvil) -> Result<usize, AnvilError> {
    anvil.register_activator::<HttpServer>()
}

#[derive(Debug)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
}

impl Loadable for Database {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Database::connect", |args| {
                    Ok(Database { url: args.next()?, pool_size: args.next()? })
                })
                .param(PropertyDescriptor::new::<String>("url").domain("database").default_value("sqlite://anvil.db"))
                .param(PropertyDescriptor::new::<u32>("poolSize").domain("database").default_value("8")),
            )
            .build()
    }
}

impl Activator for Database {
    fn init(&mut self) -> Result<(), BoxError> {
        if self.pool_size == 0 {
            return Err(format!("poolSize of {} must be positive", self.url).into());
        }
        info!(url = %self.url, pool_size = self.pool_size, "Database pool opened");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        info!(url = %self.url, "Database pool closed");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Cache {
    pub capacity: usize,
    pub ttl_seconds: u64,
}

impl Loadable for Cache {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .with_default()
            .field(PropertyDescriptor::new::<usize>("capacity").domain("cache").default_value("1024"), |cache, capacity| {
                cache.capacity = capacity;
            })
            .field(PropertyDescriptor::new::<u64>("ttlSeconds").domain("cache").default_value("300"), |cache, ttl| {
                cache.ttl_seconds = ttl;
            })
            .build()
    }
}

impl Activator for Cache {
    fn dependencies() -> Vec<ActivatorRef> {
        vec![ActivatorRef::of::<Database>()]
    }

    fn init(&mut self) -> Result<(), BoxError> {
        info!(capacity = self.capacity, ttl_seconds = self.ttl_seconds, "Cache warmed");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    pub enabled: bool,
}

impl Loadable for Metrics {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .with_default()
            .field(PropertyDescriptor::new::<bool>("enabled").domain("metrics").default_value("true"), |metrics, on| {
                metrics.enabled = on;
            })
            .build()
    }
}

/// Built by [`HttpServerFactory`], with its [`Metrics`] loaded as a nested module.
#[derive(Debug)]
pub struct HttpServer {
    pub address: String,
    pub metrics: Metrics,
}

#[derive(Debug)]
pub struct HttpServerFactory;

impl Loadable for HttpServer {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().provided_by::<HttpServerFactory>().build()
    }
}

impl Loadable for HttpServerFactory {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::factory("HttpServerFactory::bind", |args| {
                    let host: String = args.next()?;
                    let port: u16 = args.next()?;
                    Ok(HttpServer { address: format!("{host}:{port}"), metrics: args.next()? })
                })
                .param(PropertyDescriptor::new::<String>("host").domain("http").default_value("127.0.0.1"))
                .param(PropertyDescriptor::new::<u16>("port").domain("http").default_value("8080"))
                .param(PropertyDescriptor::module::<Metrics>("metrics").domain("http")),
            )
            .build()
    }
}

impl Activator for HttpServer {
    fn dependencies() -> Vec<ActivatorRef> {
        vec![ActivatorRef::of::<Cache>()]
    }

    fn init(&mut self) -> Result<(), BoxError> {
        info!(address = %self.address, metrics = self.metrics.enabled, "HTTP server listening");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        info!(address = %self.address, "HTTP server stopped");
        Ok(())
    }
}
