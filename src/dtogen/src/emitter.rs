use std::fmt::{self, Write};

use crate::ClassDescription;

const INDENT: &str = "    ";

/// A rendered source unit for one DTO.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceUnit {
    text: String,
}

impl SourceUnit {
    /// Wraps already rendered source text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The rendered source text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Takes ownership of the rendered source text.
    #[inline]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Renders class descriptions into source units.
///
/// Emitters are shared between all worker threads of a generation
/// run and must behave as pure functions of their input.
pub trait Emitter: Send + Sync {
    /// Renders `class` as a DTO declared inside `namespace`.
    fn emit(&self, namespace: &str, class: &ClassDescription) -> SourceUnit;
}

impl<F> Emitter for F
where
    F: Fn(&str, &ClassDescription) -> SourceUnit + Send + Sync,
{
    fn emit(&self, namespace: &str, class: &ClassDescription) -> SourceUnit {
        self(namespace, class)
    }
}

/// Renders C# classes with one auto-property per described property.
///
/// Classes are declared without an access modifier, so they get the
/// language default. Every property gets a public getter and a
/// private setter.
#[derive(Clone, Copy, Debug, Default)]
pub struct CSharpEmitter;

impl CSharpEmitter {
    fn render(namespace: &str, class: &ClassDescription, out: &mut String) -> fmt::Result {
        writeln!(out, "using System;")?;
        writeln!(out)?;
        writeln!(out, "namespace {namespace}")?;
        writeln!(out, "{{")?;
        writeln!(out, "{INDENT}class {}", class.name)?;
        writeln!(out, "{INDENT}{{")?;

        for property in &class.properties {
            writeln!(
                out,
                "{INDENT}{INDENT}public {} {} {{ get; private set; }}",
                property.type_name, property.name
            )?;
        }

        writeln!(out, "{INDENT}}}")?;
        writeln!(out, "}}")
    }
}

impl Emitter for CSharpEmitter {
    fn emit(&self, namespace: &str, class: &ClassDescription) -> SourceUnit {
        log::trace!("Rendering class '{}'", class.name);

        let mut text = String::new();
        // Formatting into a `String` cannot fail.
        let _ = Self::render(namespace, class, &mut text);

        SourceUnit::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_class() {
        let unit = CSharpEmitter.emit("Acme", &ClassDescription::new("Empty"));

        assert_eq!(
            unit.as_str(),
            "using System;\n\nnamespace Acme\n{\n    class Empty\n    {\n    }\n}\n"
        );
    }

    #[test]
    fn closures_are_emitters() {
        let emitter =
            |ns: &str, class: &ClassDescription| SourceUnit::new(format!("{ns}.{}", class.name));
        let unit = emitter.emit("A.B", &ClassDescription::new("C"));

        assert_eq!(unit.to_string(), "A.B.C");
    }
}
