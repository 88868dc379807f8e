use crate::config::ContextConfig;
use crate::error::Result;
use anyhow::Context as AnyhowContext;
use codemem_vector_store::VectorStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Coarse facts about the workspace, computed once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectContext {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub patterns: Vec<ArchitecturalPattern>,
    pub conventions: Vec<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchitecturalPattern {
    pub name: String,
    /// `filepath:line` of matching chunks (1-based)
    pub examples: Vec<String>,
    pub description: String,
}

/// (pattern, keyword query, description)
const PATTERN_QUERIES: &[(&str, &str, &str)] = &[
    (
        "MVC",
        "controller model view",
        "Model-View-Controller separation of concerns",
    ),
    (
        "Repository",
        "repository find save delete",
        "Data access encapsulated behind repository objects",
    ),
    (
        "Service Layer",
        "service business logic",
        "Business logic grouped into service objects",
    ),
    (
        "Singleton",
        "getinstance singleton instance",
        "Single shared instance exposed through an accessor",
    ),
    (
        "Factory",
        "factory create build",
        "Object construction delegated to factories",
    ),
    (
        "Observer",
        "subscribe emit listener event",
        "Event subscription and notification",
    ),
    (
        "Middleware",
        "middleware next request handler",
        "Request processing chained through middleware",
    ),
    (
        "Dependency Injection",
        "inject provider container",
        "Dependencies supplied by a container or provider",
    ),
];

/// (dependency name, framework)
const JS_FRAMEWORKS: &[(&str, &str)] = &[
    ("react", "react"),
    ("vue", "vue"),
    ("@angular/core", "angular"),
    ("svelte", "svelte"),
    ("next", "nextjs"),
    ("express", "express"),
    ("@nestjs/core", "nestjs"),
    ("fastify", "fastify"),
    ("electron", "electron"),
    ("jest", "jest"),
];

const RUST_FRAMEWORKS: &[(&str, &str)] = &[
    ("tokio", "tokio"),
    ("actix-web", "actix-web"),
    ("axum", "axum"),
    ("rocket", "rocket"),
    ("warp", "warp"),
    ("bevy", "bevy"),
];

const PYTHON_FRAMEWORKS: &[(&str, &str)] = &[
    ("django", "django"),
    ("flask", "flask"),
    ("fastapi", "fastapi"),
    ("pytest", "pytest"),
];

const GO_FRAMEWORKS: &[(&str, &str)] = &[
    ("github.com/gin-gonic/gin", "gin"),
    ("github.com/labstack/echo", "echo"),
    ("github.com/gofiber/fiber", "fiber"),
];

const CONVENTION_FILES: &[(&str, &str)] = &[
    (".eslintrc", "eslint"),
    (".eslintrc.js", "eslint"),
    (".eslintrc.cjs", "eslint"),
    (".eslintrc.json", "eslint"),
    ("eslint.config.js", "eslint"),
    (".prettierrc", "prettier"),
    (".prettierrc.json", "prettier"),
    ("prettier.config.js", "prettier"),
    (".editorconfig", "editorconfig"),
    ("rustfmt.toml", "rustfmt"),
    (".rustfmt.toml", "rustfmt"),
    ("clippy.toml", "clippy"),
    (".flake8", "flake8"),
];

fn push_fact(out: &mut Vec<String>, value: &str) {
    if out.iter().any(|existing| existing == value) {
        return;
    }
    out.push(value.to_string());
}

impl ProjectContext {
    /// Manifest and config-file facts for `root`. Unparseable manifests are logged and skipped.
    pub async fn detect(root: &Path) -> Self {
        let mut project = Self::default();

        for (file, convention) in CONVENTION_FILES {
            if root.join(file).is_file() {
                push_fact(&mut project.conventions, convention);
            }
        }

        if let Err(err) = project.scan_package_json(root).await {
            log::warn!("Skipping package.json: {err:#}");
        }
        if let Err(err) = project.scan_cargo_toml(root).await {
            log::warn!("Skipping Cargo.toml: {err:#}");
        }
        if let Err(err) = project.scan_python(root).await {
            log::warn!("Skipping Python manifests: {err:#}");
        }
        if let Err(err) = project.scan_go_mod(root).await {
            log::warn!("Skipping go.mod: {err:#}");
        }
        project.scan_jvm(root).await;

        log::info!(
            "Detected languages {:?}, frameworks {:?}",
            project.languages,
            project.frameworks
        );
        project
    }

    /// Search the store with fixed keyword queries and record patterns that have close hits.
    pub fn detect_patterns(
        &mut self,
        store: &mut VectorStore,
        config: &ContextConfig,
    ) -> Result<()> {
        if store.is_empty() {
            return Ok(());
        }
        for (name, query, description) in PATTERN_QUERIES {
            let mut seen = HashSet::new();
            let examples: Vec<String> = store
                .search(query, config.pattern_query_limit)?
                .into_iter()
                .filter(|hit| hit.score <= config.pattern_max_distance)
                .filter(|hit| seen.insert(hit.chunk.id.clone()))
                .map(|hit| format!("{}:{}", hit.chunk.filepath, hit.chunk.start_line + 1))
                .collect();
            if examples.is_empty() {
                continue;
            }
            log::debug!("Pattern {name}: {} examples", examples.len());
            self.patterns.push(ArchitecturalPattern {
                name: (*name).to_string(),
                examples,
                description: (*description).to_string(),
            });
        }
        Ok(())
    }

    fn record_dependencies<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
        frameworks: &[(&str, &str)],
    ) {
        for name in names {
            push_fact(&mut self.dependencies, name);
            if let Some((_, framework)) = frameworks.iter().find(|(dep, _)| *dep == name) {
                push_fact(&mut self.frameworks, framework);
            }
        }
    }

    async fn scan_package_json(&mut self, root: &Path) -> anyhow::Result<()> {
        let Some(raw) = read_optional(&root.join("package.json")).await? else {
            return Ok(());
        };
        let manifest: serde_json::Value =
            serde_json::from_str(&raw).context("parse package.json")?;

        push_fact(&mut self.languages, "javascript");
        let mut names: Vec<&str> = Vec::new();
        for section in ["dependencies", "devDependencies", "peerDependencies"] {
            if let Some(deps) = manifest.get(section).and_then(|v| v.as_object()) {
                names.extend(deps.keys().map(String::as_str));
            }
        }
        if names.contains(&"typescript") || root.join("tsconfig.json").is_file() {
            push_fact(&mut self.languages, "typescript");
        }
        self.record_dependencies(names, JS_FRAMEWORKS);

        if let Some(raw) = read_optional(&root.join("tsconfig.json")).await? {
            // tsconfig allows comments; a failed parse only loses the strict-mode hint
            if let Ok(tsconfig) = serde_json::from_str::<serde_json::Value>(&raw) {
                let strict = tsconfig
                    .pointer("/compilerOptions/strict")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if strict {
                    push_fact(&mut self.conventions, "typescript-strict");
                }
            }
        }
        Ok(())
    }

    async fn scan_cargo_toml(&mut self, root: &Path) -> anyhow::Result<()> {
        let Some(raw) = read_optional(&root.join("Cargo.toml")).await? else {
            return Ok(());
        };
        let manifest: toml::Value = toml::from_str(&raw).context("parse Cargo.toml")?;

        push_fact(&mut self.languages, "rust");
        let mut names: Vec<&str> = Vec::new();
        for section in ["dependencies", "dev-dependencies"] {
            if let Some(deps) = manifest.get(section).and_then(toml::Value::as_table) {
                names.extend(deps.keys().map(String::as_str));
            }
        }
        if let Some(deps) = manifest
            .get("workspace")
            .and_then(|w| w.get("dependencies"))
            .and_then(toml::Value::as_table)
        {
            names.extend(deps.keys().map(String::as_str));
        }
        self.record_dependencies(names, RUST_FRAMEWORKS);
        Ok(())
    }

    async fn scan_python(&mut self, root: &Path) -> anyhow::Result<()> {
        let requirements = read_optional(&root.join("requirements.txt")).await?;
        let pyproject = read_optional(&root.join("pyproject.toml")).await?;
        if requirements.is_none() && pyproject.is_none() && !root.join("setup.py").is_file() {
            return Ok(());
        }
        push_fact(&mut self.languages, "python");

        let mut names: Vec<String> = Vec::new();
        if let Some(raw) = &requirements {
            names.extend(
                raw.lines()
                    .map(str::trim)
                    .filter(|line| {
                        !line.is_empty() && !line.starts_with('#') && !line.starts_with('-')
                    })
                    .map(requirement_name),
            );
        }
        if let Some(raw) = &pyproject {
            let manifest: toml::Value = toml::from_str(raw).context("parse pyproject.toml")?;
            if let Some(deps) = manifest
                .get("project")
                .and_then(|p| p.get("dependencies"))
                .and_then(toml::Value::as_array)
            {
                names.extend(deps.iter().filter_map(toml::Value::as_str).map(requirement_name));
            }
            if let Some(deps) = manifest
                .get("tool")
                .and_then(|t| t.get("poetry"))
                .and_then(|p| p.get("dependencies"))
                .and_then(toml::Value::as_table)
            {
                names.extend(deps.keys().filter(|k| *k != "python").map(|k| k.to_lowercase()));
            }
            if let Some(tool) = manifest.get("tool").and_then(toml::Value::as_table) {
                for linter in ["black", "ruff", "isort", "mypy"] {
                    if tool.contains_key(linter) {
                        push_fact(&mut self.conventions, linter);
                    }
                }
            }
        }
        self.record_dependencies(names.iter().map(String::as_str), PYTHON_FRAMEWORKS);
        Ok(())
    }

    async fn scan_go_mod(&mut self, root: &Path) -> anyhow::Result<()> {
        let Some(raw) = read_optional(&root.join("go.mod")).await? else {
            return Ok(());
        };
        push_fact(&mut self.languages, "go");

        let mut names: Vec<&str> = Vec::new();
        let mut in_block = false;
        for line in raw.lines().map(str::trim) {
            if line.starts_with("require (") {
                in_block = true;
                continue;
            }
            if in_block && line == ")" {
                in_block = false;
                continue;
            }
            let requirement = if in_block {
                line
            } else if let Some(rest) = line.strip_prefix("require ") {
                rest
            } else {
                continue;
            };
            if let Some(module) = requirement.split_whitespace().next() {
                names.push(module);
            }
        }
        self.record_dependencies(names, GO_FRAMEWORKS);
        Ok(())
    }

    async fn scan_jvm(&mut self, root: &Path) {
        for manifest in ["pom.xml", "build.gradle", "build.gradle.kts"] {
            let Ok(Some(raw)) = read_optional(&root.join(manifest)).await else {
                continue;
            };
            let language = if manifest.ends_with(".kts") {
                "kotlin"
            } else {
                "java"
            };
            push_fact(&mut self.languages, language);
            if raw.contains("org.springframework") {
                push_fact(&mut self.frameworks, "spring");
            }
        }
    }
}

/// Package name from a PEP 508 requirement line, lowercased.
fn requirement_name(line: &str) -> String {
    line.split(|c: char| matches!(c, '=' | '<' | '>' | '~' | '!' | ';' | '[' | ' ' | '@'))
        .next()
        .unwrap_or(line)
        .trim()
        .to_lowercase()
}

async fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}
