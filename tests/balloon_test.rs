//! Integration tests for balloon content
//!
//! Templates are compiled from files and generic attributes, evaluated
//! against the in-memory city database and attached to the exported
//! placemarks.

mod common;

use citykml::balloon::{compile, BalloonHandler, SqlCache, StatementExecutor};
use citykml::config::parse_config;
use citykml::core::export::{BundleSink, ExportCoordinator};
use citykml::domain::{CityObjectClass, CityObjectId, Lod};
use common::{CollectingSink, StubObject, StubProvider, CONNECTION_STRING};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

fn city() -> StubProvider {
    StubProvider::new([
        StubObject::new(1, CityObjectClass::Building).with_name("Rotes Rathaus"),
        StubObject::new(2, CityObjectClass::Building)
            .with_name("Fernsehturm")
            .with_balloon_attribute("<i><3DCityDB>CITYOBJECT/GMLID</3DCityDB></i>"),
        StubObject::new(3, CityObjectClass::Building)
            .with_balloon_attribute("<3DCityDB>CITYOBJECT/NAME"),
        StubObject::new(4, CityObjectClass::CityFurniture).with_name("Bench"),
    ])
}

async fn export_descriptions(balloon: &str) -> BTreeMap<i64, Option<String>> {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("building.html");
    std::fs::write(&template, "<b><3DCityDB>CITYOBJECT/NAME</3DCityDB></b>").unwrap();

    let config = parse_config(&format!(
        r#"
[database]
connection_string = "{CONNECTION_STRING}"

[export]
workers = 2
classes = ["building", "city_furniture"]

[balloon.building]
template_file = "{}"
{balloon}

[logging]
local_enabled = false
"#,
        template.display()
    ))
    .unwrap();

    let (_tx, rx) = watch::channel(false);
    let sink = Arc::new(CollectingSink::default());
    let coordinator = ExportCoordinator::with_provider(config, Arc::new(city()), rx);
    coordinator
        .run_pipeline(Arc::clone(&sink) as Arc<dyn BundleSink>)
        .await
        .unwrap();

    sink.bundles()
        .into_iter()
        .flat_map(|b| b.placemarks)
        .map(|p| (p.object_id.get(), p.description))
        .collect()
}

#[tokio::test]
async fn test_file_template_rendered_for_every_object_of_class() {
    let descriptions = export_descriptions("content_source = \"file\"").await;

    assert_eq!(descriptions[&1].as_deref(), Some("<b>Rotes Rathaus</b>"));
    assert_eq!(descriptions[&2].as_deref(), Some("<b>Fernsehturm</b>"));
    // No balloon configured for city furniture
    assert_eq!(descriptions[&4], None);
}

#[tokio::test]
async fn test_attribute_takes_precedence_over_file() {
    let descriptions = export_descriptions("content_source = \"generic_attribute_or_file\"").await;

    assert_eq!(descriptions[&1].as_deref(), Some("<b>Rotes Rathaus</b>"));
    assert_eq!(descriptions[&2].as_deref(), Some("<i>BUILDING_2</i>"));
    // A malformed attribute template yields no content
    assert_eq!(descriptions[&3], None);
}

#[tokio::test]
async fn test_attribute_only_source() {
    let descriptions = export_descriptions("content_source = \"generic_attribute\"").await;

    assert_eq!(descriptions[&1], None);
    assert_eq!(descriptions[&2].as_deref(), Some("<i>BUILDING_2</i>"));
}

#[tokio::test]
async fn test_disabled_description() {
    let descriptions = export_descriptions("include_description = false").await;
    assert!(descriptions.values().all(Option::is_none));
}

#[tokio::test]
async fn test_statement_sql_compiled_once_and_shared() {
    let provider = city();
    let template = Arc::new(compile("<3DCityDB>CITYOBJECT/NAME</3DCityDB> / <3DCityDB>NOPE/X</3DCityDB>").unwrap());
    let handler = BalloonHandler::with_template(Arc::clone(&template));
    let lod = Lod::default();

    let connection = provider.connection();
    let first = handler
        .content(&connection, CityObjectId::new(1).unwrap(), lod)
        .await
        .unwrap();
    let second = handler
        .content(&connection, CityObjectId::new(2).unwrap(), lod)
        .await
        .unwrap();

    // Unsupported statements render empty, the rest of the template survives
    assert_eq!(first.as_deref(), Some("Rotes Rathaus / "));
    assert_eq!(second.as_deref(), Some("Fernsehturm / "));

    let statements = template.statements();
    assert!(matches!(statements[0].sql_cache(), SqlCache::Compiled(_)));
    assert_eq!(statements[1].sql_cache(), SqlCache::Failed);
}

#[tokio::test]
async fn test_executor_on_missing_object_renders_empty() {
    let provider = city();
    let connection = provider.connection();
    let executor = StatementExecutor::new(&connection);
    let template = compile("[<3DCityDB>CITYOBJECT/NAME</3DCityDB>]").unwrap();

    let rendered = executor
        .render(&template, CityObjectId::new(99).unwrap(), Lod::default())
        .await
        .unwrap();
    assert_eq!(rendered, "[]");
}
