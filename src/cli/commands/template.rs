//! Check-template command implementation
//!
//! Compiles a balloon template offline and prints the SQL of each statement,
//! so template authors can see problems before running an export.

use crate::balloon::{compile_file, BalloonStatement, CompiledTemplate};
use crate::domain::CityKmlError;
use clap::Args;

/// Arguments for the check-template command
#[derive(Args, Debug)]
pub struct CheckTemplateArgs {
    /// Balloon template file
    pub file: String,
}

/// Outcome of checking one statement
#[derive(Debug, PartialEq)]
pub enum StatementCheck {
    Sql(String),
    /// SQL depends on the rendered object
    Deferred,
    Unsupported(String),
}

impl CheckTemplateArgs {
    /// Execute the check-template command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file, "Checking balloon template");

        let template = match compile_file(&self.file) {
            Ok(template) => template,
            Err(CityKmlError::Template(e)) => {
                println!("❌ Template does not compile: {e}");
                return Ok(2);
            }
            Err(e) => {
                println!("❌ Failed to read template: {e}");
                return Ok(2);
            }
        };

        let checks = check_statements(&template);
        println!(
            "Template {}: {} statement(s), {} text chunk(s)",
            self.file,
            checks.len(),
            template.chunks().len()
        );

        let mut unsupported = 0;
        for (index, (statement, check)) in template.statements().iter().zip(&checks).enumerate() {
            println!("  [{index}] {}", statement.raw_text().trim());
            match check {
                StatementCheck::Sql(sql) => println!("      ✅ {sql}"),
                StatementCheck::Deferred => println!("      ⏳ nested, SQL built per object"),
                StatementCheck::Unsupported(message) => {
                    unsupported += 1;
                    println!("      ⚠️  {message}");
                }
            }
        }

        Ok(if unsupported == 0 { 0 } else { 1 })
    }
}

/// Compiles the SQL of every statement that does not depend on the object
pub fn check_statements(template: &CompiledTemplate) -> Vec<StatementCheck> {
    template.statements().iter().map(check_statement).collect()
}

fn check_statement(statement: &BalloonStatement) -> StatementCheck {
    if statement.is_nested() {
        return StatementCheck::Deferred;
    }
    match statement.compiled_query() {
        Ok(query) => StatementCheck::Sql(query.sql),
        Err(e) => StatementCheck::Unsupported(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balloon::compile;
    use std::io::Write;

    #[test]
    fn test_check_statements_classifies_each_statement() {
        let template = compile(
            "<3DCityDB>BUILDING/MEASURED_HEIGHT</3DCityDB>\
             <3DCityDB>NO_SUCH_TABLE/NAME</3DCityDB>\
             <3DCityDB>BUILDING/<3DCityDB>CITYOBJECT/NAME</3DCityDB></3DCityDB>",
        )
        .unwrap();

        let checks = check_statements(&template);
        assert!(matches!(&checks[0], StatementCheck::Sql(sql) if sql.contains("measured_height")));
        assert!(matches!(&checks[1], StatementCheck::Unsupported(_)));
        assert_eq!(checks[2], StatementCheck::Deferred);
    }

    #[tokio::test]
    async fn test_execute_reports_syntax_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<3DCityDB>BUILDING/NAME").unwrap();

        let args = CheckTemplateArgs {
            file: file.path().to_string_lossy().to_string(),
        };
        assert_eq!(args.execute().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_execute_valid_template() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p><3DCityDB>CITYOBJECT/GMLID</3DCityDB></p>").unwrap();

        let args = CheckTemplateArgs {
            file: file.path().to_string_lossy().to_string(),
        };
        assert_eq!(args.execute().await.unwrap(), 0);
    }
}
