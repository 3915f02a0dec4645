use crate::core::context::Context;
use crate::domain::error::{ShroudError, ShroudResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Product used when none was given at first registration
pub const DEFAULT_PRODUCT: &str = "non-profits";
/// Placeholder product that may be replaced once
pub const TBD_PRODUCT: &str = "TBD";
/// Record of the current registration inside the license directory
pub const REGISTRATION_FILE: &str = "registration.toml";

/// Persisted registration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub regname: String,
    pub product: String,
    /// File name of the installed registration file
    pub regfile: String,
    #[serde(default)]
    pub upgraded: bool,
}

impl std::fmt::Display for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let edition = if self.upgraded { "pro" } else { "basic" };
        let regname = if self.regname.is_empty() { "-" } else { &self.regname };
        writeln!(f, "License to : {}", regname)?;
        writeln!(f, "Product    : {}", self.product)?;
        write!(f, "Edition    : {}", edition)
    }
}

/// A register or upgrade request as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub regfile: PathBuf,
    pub regname: String,
    /// Explicit product, `None` when not given
    pub product: Option<String>,
}

/// Register versus upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterMode {
    Register,
    Upgrade,
}

impl RegisterMode {
    pub fn from_flag(upgrade: bool) -> Self {
        if upgrade {
            RegisterMode::Upgrade
        } else {
            RegisterMode::Register
        }
    }
}

/// License registration handler
pub trait Registrar {
    /// Reject requests that cannot succeed, before anything is touched
    fn check_args(&self, request: &RegisterRequest) -> ShroudResult<()>;

    fn register(&mut self, request: &RegisterRequest) -> ShroudResult<Registration>;

    fn upgrade(&mut self, request: &RegisterRequest) -> ShroudResult<Registration>;

    /// Human readable license summary
    fn summary(&self) -> ShroudResult<String>;
}

fn registration_path(ctx: &Context) -> PathBuf {
    ctx.license_dir().join(REGISTRATION_FILE)
}

/// Current registration record, `None` when unregistered
pub fn read_registration(ctx: &Context) -> ShroudResult<Option<Registration>> {
    let path = registration_path(ctx);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&content).map(Some).map_err(|e| {
        ShroudError::Registration(format!("broken registration record {}: {}", path.display(), e))
    })
}

fn unregistered_summary() -> String {
    "License to : -\nProduct    : trial (unregistered)".to_string()
}

fn check_product(current: &Registration, requested: Option<&str>) -> ShroudResult<()> {
    match requested {
        Some(product) if product != current.product && current.product != TBD_PRODUCT => {
            Err(ShroudError::Registration(format!(
                "product name \"{}\" can't be changed to \"{}\"",
                current.product, product
            )))
        }
        _ => Ok(()),
    }
}

fn regfile_name(request: &RegisterRequest) -> ShroudResult<String> {
    request
        .regfile
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            ShroudError::usage(format!(
                "invalid registration file \"{}\"",
                request.regfile.display()
            ))
        })
}

/// The record a register request would produce on top of `current`
pub fn plan_register(
    current: Option<&Registration>,
    request: &RegisterRequest,
) -> ShroudResult<Registration> {
    let regfile = regfile_name(request)?;
    match current {
        None => Ok(Registration {
            regname: request.regname.clone(),
            product: request
                .product
                .clone()
                .unwrap_or_else(|| DEFAULT_PRODUCT.to_string()),
            regfile,
            upgraded: false,
        }),
        Some(current) => {
            check_product(current, request.product.as_deref())?;
            Ok(Registration {
                regname: if request.regname.is_empty() {
                    current.regname.clone()
                } else {
                    request.regname.clone()
                },
                product: request
                    .product
                    .clone()
                    .unwrap_or_else(|| current.product.clone()),
                regfile,
                upgraded: current.upgraded,
            })
        }
    }
}

/// The record an upgrade request would produce on top of `current`
pub fn plan_upgrade(
    current: Option<&Registration>,
    request: &RegisterRequest,
) -> ShroudResult<Registration> {
    let current = current.ok_or_else(|| {
        ShroudError::Registration("no license registered, register it before upgrading".into())
    })?;
    let mut next = plan_register(Some(current), request)?;
    next.upgraded = true;
    Ok(next)
}

fn check_regfile(path: &Path) -> ShroudResult<()> {
    if !path.is_file() {
        return Err(ShroudError::usage(format!(
            "registration file \"{}\" not found",
            path.display()
        )));
    }
    Ok(())
}

/// Registrar that installs the registration into the home path
pub struct LicenseRegistrar<'a> {
    ctx: &'a Context,
}

impl<'a> LicenseRegistrar<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn install(&self, request: &RegisterRequest, record: &Registration) -> ShroudResult<()> {
        let license_dir = self.ctx.license_dir();
        fs::create_dir_all(&license_dir)?;
        fs::copy(&request.regfile, license_dir.join(&record.regfile))?;

        let content = toml::to_string_pretty(record).map_err(|e| {
            ShroudError::Registration(format!("failed to serialize registration: {}", e))
        })?;
        fs::write(registration_path(self.ctx), content)?;
        info!("install registration file to \"{}\"", license_dir.display());
        Ok(())
    }
}

impl Registrar for LicenseRegistrar<'_> {
    fn check_args(&self, request: &RegisterRequest) -> ShroudResult<()> {
        check_regfile(&request.regfile)
    }

    fn register(&mut self, request: &RegisterRequest) -> ShroudResult<Registration> {
        let current = read_registration(self.ctx)?;
        let record = plan_register(current.as_ref(), request)?;
        self.install(request, &record)?;
        info!("register \"{}\" OK", record.product);
        Ok(record)
    }

    fn upgrade(&mut self, request: &RegisterRequest) -> ShroudResult<Registration> {
        let current = read_registration(self.ctx)?;
        let record = plan_upgrade(current.as_ref(), request)?;
        self.install(request, &record)?;
        info!("upgrade \"{}\" OK", record.product);
        Ok(record)
    }

    fn summary(&self) -> ShroudResult<String> {
        Ok(read_registration(self.ctx)?
            .map(|record| record.to_string())
            .unwrap_or_else(unregistered_summary))
    }
}

/// Registrar that runs every check but never writes anything
pub struct DryRunRegistrar<'a> {
    ctx: &'a Context,
    planned: Option<Registration>,
}

impl<'a> DryRunRegistrar<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx, planned: None }
    }
}

impl Registrar for DryRunRegistrar<'_> {
    fn check_args(&self, request: &RegisterRequest) -> ShroudResult<()> {
        check_regfile(&request.regfile)
    }

    fn register(&mut self, request: &RegisterRequest) -> ShroudResult<Registration> {
        let current = read_registration(self.ctx)?;
        let record = plan_register(current.as_ref(), request)?;
        info!("dry run, \"{}\" is not registered", record.product);
        self.planned = Some(record.clone());
        Ok(record)
    }

    fn upgrade(&mut self, request: &RegisterRequest) -> ShroudResult<Registration> {
        let current = read_registration(self.ctx)?;
        let record = plan_upgrade(current.as_ref(), request)?;
        info!("dry run, \"{}\" is not upgraded", record.product);
        self.planned = Some(record.clone());
        Ok(record)
    }

    fn summary(&self) -> ShroudResult<String> {
        match &self.planned {
            Some(record) => Ok(record.to_string()),
            None => Ok(read_registration(self.ctx)?
                .map(|record| record.to_string())
                .unwrap_or_else(unregistered_summary)),
        }
    }
}
