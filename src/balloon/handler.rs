//! Per-class balloon content
//!
//! A handler decides where an object's template comes from (the shared
//! template file, a generic attribute of the object, or both) and renders it
//! through a [`StatementExecutor`].

use super::compiler::{compile, compile_file, CompiledTemplate};
use super::executor::StatementExecutor;
use crate::adapters::database::{ExportConnection, SqlParam};
use crate::config::{BalloonConfig, BalloonContentSource, CityKmlConfig};
use crate::domain::{CityObjectClass, CityObjectId, Lod, Result};
use std::collections::HashMap;
use std::sync::Arc;

const ATTRIBUTE_TEMPLATE_SQL: &str =
    "SELECT strval FROM cityobject_genericattrib WHERE cityobject_id = $1 AND attrname = $2";

/// Renders descriptive content for objects of one class
#[derive(Debug, Clone)]
pub struct BalloonHandler {
    source: BalloonContentSource,
    template: Option<Arc<CompiledTemplate>>,
    attribute_name: String,
}

impl BalloonHandler {
    /// Builds a handler, compiling the template file once
    ///
    /// A template file that cannot be read or does not compile is logged and
    /// disables file-based content for the class; the export continues.
    pub fn from_config(class: CityObjectClass, config: &BalloonConfig) -> Self {
        let template = match (&config.template_file, config.content_source.uses_file()) {
            (Some(path), true) => match compile_file(path) {
                Ok(template) => {
                    tracing::info!(
                        class = %class,
                        template = %path.display(),
                        statements = template.statements().len(),
                        "Compiled balloon template"
                    );
                    Some(Arc::new(template))
                }
                Err(e) => {
                    tracing::error!(
                        class = %class,
                        template = %path.display(),
                        error = %e,
                        "Balloon template disabled"
                    );
                    None
                }
            },
            _ => None,
        };

        Self {
            source: config.content_source,
            template,
            attribute_name: config.attribute_name.clone(),
        }
    }

    /// Handler rendering one shared template for every object
    pub fn with_template(template: Arc<CompiledTemplate>) -> Self {
        Self {
            source: BalloonContentSource::File,
            template: Some(template),
            attribute_name: String::new(),
        }
    }

    pub fn source(&self) -> BalloonContentSource {
        self.source
    }

    pub fn template(&self) -> Option<&Arc<CompiledTemplate>> {
        self.template.as_ref()
    }

    /// Renders the balloon for one object
    ///
    /// Returns `Ok(None)` when the object has no applicable template.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` if the connection is lost.
    pub async fn content<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        object_id: CityObjectId,
        lod: Lod,
    ) -> Result<Option<String>> {
        let executor = StatementExecutor::new(connection);

        if self.source.uses_attribute() {
            if let Some(text) = self.attribute_template(connection, object_id).await? {
                return match compile(&text) {
                    Ok(template) => Ok(Some(executor.render(&template, object_id, lod).await?)),
                    Err(e) => {
                        tracing::warn!(
                            object_id = %object_id,
                            attribute = %self.attribute_name,
                            error = %e,
                            "Ignoring malformed balloon attribute"
                        );
                        Ok(None)
                    }
                };
            }
        }

        match (&self.template, self.source.uses_file()) {
            (Some(template), true) => Ok(Some(executor.render(template, object_id, lod).await?)),
            _ => Ok(None),
        }
    }

    async fn attribute_template<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        object_id: CityObjectId,
    ) -> Result<Option<String>> {
        let params = [
            SqlParam::Int(object_id.get()),
            SqlParam::Text(self.attribute_name.clone()),
        ];
        match connection.query(ATTRIBUTE_TEMPLATE_SQL, &params).await {
            Ok(rows) => Ok(rows
                .first()
                .and_then(|row| row.get(0))
                .and_then(|value| value.as_str())
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)),
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => {
                tracing::warn!(object_id = %object_id, error = %e, "Balloon attribute lookup failed");
                Ok(None)
            }
        }
    }
}

/// Balloon handlers of every class with descriptive content enabled
#[derive(Debug, Clone, Default)]
pub struct BalloonRegistry {
    handlers: HashMap<CityObjectClass, BalloonHandler>,
}

impl BalloonRegistry {
    pub fn from_config(config: &CityKmlConfig) -> Self {
        let handlers = CityObjectClass::ALL
            .iter()
            .filter_map(|class| {
                config
                    .balloon_for(*class)
                    .map(|balloon| (*class, BalloonHandler::from_config(*class, balloon)))
            })
            .collect();
        Self { handlers }
    }

    pub fn insert(&mut self, class: CityObjectClass, handler: BalloonHandler) {
        self.handlers.insert(class, handler);
    }

    pub fn get(&self, class: CityObjectClass) -> Option<&BalloonHandler> {
        self.handlers.get(&class)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
