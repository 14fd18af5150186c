//! Database provider: MySQL, MariaDB, PostgreSQL, MongoDB.

use dockyard_common::constants::{DEFAULT_DATABASE, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::{HealthCheck, ResourceKind};

/// How one database engine is run and reached.
#[derive(Debug)]
struct EngineRecipe {
    subtype: &'static str,
    image: &'static str,
    port: u16,
    /// Value of `DB_CONNECTION`.
    driver: &'static str,
    scheme: &'static str,
    url_suffix: &'static str,
    data_dir: &'static str,
    /// Container variables for root password, user, password, database.
    container_vars: [Option<&'static str>; 4],
    /// Consumer credential variables for user, password, database.
    consumer_vars: [&'static str; 3],
}

static ENGINES: [EngineRecipe; 4] = [
    EngineRecipe {
        subtype: "mysql",
        image: "mysql",
        port: 3306,
        driver: "mysql",
        scheme: "mysql",
        url_suffix: "",
        data_dir: "/var/lib/mysql",
        container_vars: [
            Some("MYSQL_ROOT_PASSWORD"),
            Some("MYSQL_USER"),
            Some("MYSQL_PASSWORD"),
            Some("MYSQL_DATABASE"),
        ],
        consumer_vars: ["MYSQL_USER", "MYSQL_PASSWORD", "MYSQL_DATABASE"],
    },
    EngineRecipe {
        subtype: "mariadb",
        image: "mariadb",
        port: 3306,
        driver: "mariadb",
        scheme: "mariadb",
        url_suffix: "",
        data_dir: "/var/lib/mysql",
        container_vars: [
            Some("MARIADB_ROOT_PASSWORD"),
            Some("MARIADB_USER"),
            Some("MARIADB_PASSWORD"),
            Some("MARIADB_DATABASE"),
        ],
        consumer_vars: ["MARIADB_USER", "MARIADB_PASSWORD", "MARIADB_DATABASE"],
    },
    EngineRecipe {
        subtype: "postgres",
        image: "postgres",
        port: 5432,
        driver: "pgsql",
        scheme: "postgresql",
        url_suffix: "",
        data_dir: "/var/lib/postgresql/data",
        container_vars: [
            None,
            Some("POSTGRES_USER"),
            Some("POSTGRES_PASSWORD"),
            Some("POSTGRES_DB"),
        ],
        consumer_vars: ["POSTGRES_USER", "POSTGRES_PASSWORD", "POSTGRES_DB"],
    },
    EngineRecipe {
        subtype: "mongodb",
        image: "mongo",
        port: 27017,
        driver: "mongodb",
        scheme: "mongodb",
        url_suffix: "?authSource=admin",
        data_dir: "/data/db",
        container_vars: [
            None,
            Some("MONGO_INITDB_ROOT_USERNAME"),
            Some("MONGO_INITDB_ROOT_PASSWORD"),
            Some("MONGO_INITDB_DATABASE"),
        ],
        consumer_vars: ["MONGODB_USERNAME", "MONGODB_PASSWORD", "MONGODB_DATABASE"],
    },
];

fn engine(subtype: &str) -> Option<&'static EngineRecipe> {
    ENGINES.iter().find(|e| e.subtype == subtype)
}

impl EngineRecipe {
    fn healthcheck(&self, credentials: &Credentials) -> HealthCheck {
        match self.subtype {
            "postgres" => HealthCheck::probe([
                "CMD-SHELL".to_owned(),
                format!(
                    "pg_isready -U {} -d {}",
                    credentials.username_or(DEFAULT_USERNAME),
                    credentials.database_or(DEFAULT_DATABASE)
                ),
            ]),
            "mariadb" => HealthCheck::probe([
                "CMD",
                "healthcheck.sh",
                "--connect",
                "--innodb_initialized",
            ]),
            "mongodb" => HealthCheck::probe([
                "CMD",
                "mongosh",
                "--quiet",
                "--eval",
                "db.adminCommand('ping')",
            ]),
            _ => HealthCheck::probe(["CMD", "mysqladmin", "ping", "-h", "localhost"]),
        }
    }
}

/// Provider for the `database` kind.
#[derive(Debug)]
pub struct DatabaseProvider {
    catalog: Catalog,
}

impl DatabaseProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for DatabaseProvider {
    fn default() -> Self {
        Self::new(
            Catalog::new()
                .with("mysql", VersionTable::new("8.0", &["5.7", "8.0", "8.4"]))
                .with("mariadb", VersionTable::new("11.4", &["10.11", "11.4"]))
                .with("postgres", VersionTable::new("16", &["14", "15", "16", "17"]))
                .with("mongodb", VersionTable::new("7.0", &["6.0", "7.0"])),
        )
    }
}

impl Provider for DatabaseProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Database
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, _subtype: &str) -> bool {
        true
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        let engine = engine(&request.subtype).ok_or_else(|| {
            DockyardError::validation("database subtype", &request.subtype, "no recipe available")
        })?;
        let overrides = &request.overrides;
        let credentials = Credentials {
            username: Some(overrides.username.clone().unwrap_or_else(|| DEFAULT_USERNAME.into())),
            password: Some(overrides.password.clone().unwrap_or_else(|| DEFAULT_PASSWORD.into())),
            database: Some(overrides.database.clone().unwrap_or_else(|| DEFAULT_DATABASE.into())),
        };

        let values = [
            credentials.password_or(DEFAULT_PASSWORD),
            credentials.username_or(DEFAULT_USERNAME),
            credentials.password_or(DEFAULT_PASSWORD),
            credentials.database_or(DEFAULT_DATABASE),
        ];
        let mut entry = SharedResourceEntry::new(
            request,
            format!("{}:{}", engine.image, request.version),
        )
        .port(engine.port)
        .data_volume(engine.data_dir)
        .healthcheck(engine.healthcheck(&credentials));
        for (var, value) in engine.container_vars.iter().zip(values) {
            if let Some(var) = var {
                entry = entry.env(*var, value);
            }
        }
        Ok(entry.credentials(credentials))
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        credentials: &Credentials,
    ) -> Vec<(String, String)> {
        let Some(engine) = engine(entry.key.subtype()) else {
            return Vec::new();
        };
        let user = credentials.username_or(DEFAULT_USERNAME);
        let password = credentials.password_or(DEFAULT_PASSWORD);
        let database = credentials.database_or(DEFAULT_DATABASE);
        // Only the URL is escaped; the discrete variables carry raw values.
        let url = format!(
            "{}://{}:{}@{}:{}/{}{}",
            engine.scheme,
            urlencoding::encode(user),
            urlencoding::encode(password),
            entry.host(),
            entry.port_string(),
            urlencoding::encode(database),
            engine.url_suffix
        );
        let [user_var, password_var, database_var] = engine.consumer_vars;
        vec![
            ("DB_CONNECTION".into(), engine.driver.into()),
            ("DB_HOST".into(), entry.host().into()),
            ("DATABASE_URL".into(), url),
            (user_var.into(), user.into()),
            (password_var.into(), password.into()),
            (database_var.into(), database.into()),
        ]
    }
}
