use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use storefront_core::auth::SessionState;
use storefront_core::config::Config;
use storefront_core::models::{LoginRequest, ProductQuery, RegisterRequest};
use storefront_core::router::LOGIN_ROUTE;
use storefront_core::Storefront;
use tracing::warn;

const USERNAME_ENV: &str = "STOREFRONT_USERNAME";
const PASSWORD_ENV: &str = "STOREFRONT_PASSWORD";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    Status,
    WhoAmI,
    Register { username: String, email: Option<String> },
    Products { page: u32, keyword: Option<String> },
    Product { ids: Vec<i64> },
    Open { path: String },
}

impl Command {
    pub fn parse(args: &[String]) -> Option<Self> {
        let (name, rest) = args.split_first()?;
        let arg = |i: usize| rest.get(i).cloned();

        Some(match name.as_str() {
            "login" => Command::Login { username: arg(0) },
            "logout" => Command::Logout,
            "status" => Command::Status,
            "whoami" => Command::WhoAmI,
            "register" => Command::Register {
                username: arg(0)?,
                email: arg(1),
            },
            "products" => Command::Products {
                page: match arg(0) {
                    Some(p) => p.parse().ok()?,
                    None => ProductQuery::default().page_num,
                },
                keyword: arg(1),
            },
            "product" => {
                let ids = rest.iter().map(|s| s.parse().ok()).collect::<Option<Vec<i64>>>()?;
                if ids.is_empty() {
                    return None;
                }
                Command::Product { ids }
            }
            "open" => Command::Open { path: arg(0)? },
            _ => return None,
        })
    }
}

pub async fn run(command: Command, shop: &Storefront, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => login(shop, config, username).await,
        Command::Logout => {
            shop.api.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Status => {
            status(shop);
            Ok(())
        }
        Command::WhoAmI => {
            let name = shop.api.me().await?;
            println!("{}", name);
            Ok(())
        }
        Command::Register { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let created = shop
                .api
                .register(&RegisterRequest {
                    username,
                    password,
                    email,
                    phone: None,
                })
                .await?;
            println!("Registered {} (id {})", created.username, created.id);
            Ok(())
        }
        Command::Products { page, keyword } => {
            let query = ProductQuery {
                page_num: page,
                keyword,
                ..ProductQuery::default()
            };
            let page = shop.api.list_products(&query).await?;
            for p in &page.records {
                let price = p.price.map(|v| format!("{:.2}", v)).unwrap_or_default();
                println!("{:>8}  {:<40} {:>10}", p.id, p.name, price);
            }
            println!("page {}/{} ({} products)", page.current, page.pages, page.total);
            Ok(())
        }
        Command::Product { ids } => {
            let results = join_all(ids.iter().map(|id| shop.api.get_product(*id))).await;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(detail) => {
                        let p = &detail.product;
                        println!("#{} {}", p.id, p.name);
                        if let Some(desc) = &p.description {
                            println!("  {}", desc);
                        }
                        if let Some(price) = p.price {
                            println!("  price: {:.2}", price);
                        }
                        if let Some(stock) = p.stock {
                            println!("  stock: {}", stock);
                        }
                    }
                    Err(e) => eprintln!("#{}: {}", id, e),
                }
            }
            Ok(())
        }
        Command::Open { path } => open(shop, config, &path).await,
    }
}

async fn login(shop: &Storefront, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .or_else(|| config.last_username.clone())
    {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) => p,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    if !shop.api.login(&LoginRequest::new(username.clone(), password)).await {
        bail!("Login failed");
    }

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    status(shop);
    Ok(())
}

async fn open(shop: &Storefront, config: &mut Config, path: &str) -> Result<()> {
    let mut location = shop.navigator.push(path)?;

    let on_login = shop
        .navigator
        .routes()
        .resolve(&location.path)
        .is_some_and(|r| r.name == LOGIN_ROUTE);
    if on_login && !shop.session.is_logged_in() {
        println!("{} requires login", path);
        login(shop, config, None).await?;
        location = shop.navigator.resume_after_login()?;
    }

    println!("{}", location);
    Ok(())
}

fn status(shop: &Storefront) {
    match shop.session.state() {
        SessionState::Unauthenticated => println!("Not logged in"),
        SessionState::Authenticated { user } => {
            println!("Logged in as {} (id {})", user.username, user.id);
            if let Some(email) = &user.email {
                println!("  email:   {}", email);
            }
            if let Some(phone) = &user.phone {
                println!("  phone:   {}", phone);
            }
            println!("  balance: {:.2}", user.balance);
            if !user.roles.is_empty() {
                let roles: Vec<&str> = user.roles.iter().map(String::as_str).collect();
                println!("  roles:   {}", roles.join(", "));
            }
            if let Some(at) = shop.session.snapshot().logged_in_at {
                println!("  since:   {}", at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(&args("login alice")),
            Some(Command::Login { username: Some("alice".into()) })
        );
        assert_eq!(
            Command::parse(&args("products")),
            Some(Command::Products { page: 1, keyword: None })
        );
        assert_eq!(
            Command::parse(&args("products 3 lamp")),
            Some(Command::Products { page: 3, keyword: Some("lamp".into()) })
        );
        assert_eq!(
            Command::parse(&args("product 1 2")),
            Some(Command::Product { ids: vec![1, 2] })
        );
        assert_eq!(
            Command::parse(&args("open /orders")),
            Some(Command::Open { path: "/orders".into() })
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Command::parse(&[]), None);
        assert_eq!(Command::parse(&args("product")), None);
        assert_eq!(Command::parse(&args("product x")), None);
        assert_eq!(Command::parse(&args("products two")), None);
        assert_eq!(Command::parse(&args("register")), None);
        assert_eq!(Command::parse(&args("frobnicate")), None);
    }
}
