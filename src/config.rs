//! Command-line and environment configuration.

use std::net::{Ipv4Addr, SocketAddr};

use clap::{Parser, ValueEnum};

/// Which application to serve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// `/pure/{name}` and a documented `/openapi/{name}` greeting.
    HelloWorld,
    /// Public CRUD on `/cars`, no failures documented.
    Crud,
    /// Public CRUD, `404` documented on every route.
    StatusPages,
    /// Public CRUD, `404` documented on the id routes only.
    ScopedErrors,
    /// Public reads, gated writes, and a gated `/hello`.
    #[default]
    Authenticated,
}

impl Variant {
    pub fn default_port(self) -> u16 {
        match self {
            Variant::HelloWorld    => 9001,
            Variant::Crud          => 9002,
            Variant::StatusPages   => 9003,
            Variant::ScopedErrors  => 9004,
            Variant::Authenticated => 9005,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(name = "carlot")]
#[command(about = "An in-memory car registry over HTTP, with OpenAPI docs and basic auth")]
pub struct Config {
    #[arg(long, env = "CARLOT_VARIANT", value_enum, default_value_t = Variant::Authenticated)]
    pub variant: Variant,

    /// Listen address. Defaults to all interfaces on the variant's port.
    #[arg(long, env = "CARLOT_ADDR")]
    pub addr: Option<SocketAddr>,

    /// Name accepted by the basic-auth gate.
    #[arg(long, env = "CARLOT_USERNAME", default_value = "user")]
    pub username: String,

    #[arg(long, env = "CARLOT_PASSWORD", default_value = "pass", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "CARLOT_REALM", default_value = "Access to the '/' path")]
    pub realm: String,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        self.addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.variant.default_port())))
    }
}
