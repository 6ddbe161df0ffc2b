//! Build-recipe templates used when a checked-out tree ships no Dockerfile.
//!
//! Pure functions only: tree probing and file writes live in
//! `application::services::build_context`.

use serde::{Deserialize, Deserializer};

pub const DOCKERFILE: &str = "Dockerfile";
pub const NODE_MANIFEST: &str = "package.json";
pub const PYTHON_REQUIREMENTS: &str = "requirements.txt";
pub const DEFAULT_PYTHON_ENTRY: &str = "app.py";

/// Conventional python entry points, in probe order.
pub const PYTHON_ENTRY_CANDIDATES: &[&str] = &[
    "main.py", "app.py", "bot.py", "server.py", "index.py", "run.py", "start.py",
];

pub const DEFAULT_REQUIREMENTS: &str = "flask==2.3.3
requests==2.31.0
python-dotenv==1.0.0
pyTelegramBotAPI==4.14.0
";

pub const DEFAULT_PYTHON_APP: &str = r#"#!/usr/bin/env python3
"""Placeholder application generated by hostpilot."""
import datetime
import os
from http.server import BaseHTTPRequestHandler, HTTPServer


class StatusHandler(BaseHTTPRequestHandler):
    def do_GET(self):
        self.send_response(200)
        self.send_header("Content-type", "text/html")
        self.end_headers()
        page = (
            "<html><head><title>hostpilot</title></head><body>"
            "<h1>Application is running</h1>"
            f"<p>Time: {datetime.datetime.now()}</p>"
            f"<p>Port: {os.environ.get('PORT', '8000')}</p>"
            "</body></html>"
        )
        self.wfile.write(page.encode())

    def log_message(self, format, *args):
        pass


def main():
    port = int(os.environ.get("PORT", 8000))
    HTTPServer(("0.0.0.0", port), StatusHandler).serve_forever()


if __name__ == "__main__":
    main()
"#;

/// Application kind declared by the deployment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppKind {
    Node,
    Python,
    Php,
    #[default]
    Auto,
}

impl AppKind {
    /// Parse a declared kind. Anything unrecognized means auto-detection.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "node" | "nodejs" => Self::Node,
            "python" => Self::Python,
            "php" => Self::Php,
            _ => Self::Auto,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Python => "python",
            Self::Php => "php",
            Self::Auto => "auto",
        }
    }
}

impl<'de> Deserialize<'de> for AppKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Auto, Self::parse))
    }
}

/// Concrete template selected for a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    Node,
    Python { entry: String },
    Php,
    Static,
}

impl Recipe {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Python { .. } => "python",
            Self::Php => "php",
            Self::Static => "static",
        }
    }

    /// Dockerfile text for this template, exposing `port`.
    #[must_use]
    pub fn render(&self, port: u16) -> String {
        match self {
            Self::Node => format!(
                "FROM node:18-alpine
WORKDIR /app
COPY package*.json ./
RUN npm ci --only=production
COPY . .
ENV PORT={port}
EXPOSE {port}
CMD [\"npm\", \"start\"]
"
            ),
            Self::Python { entry } => format!(
                "FROM python:3.11-slim
WORKDIR /app
COPY {PYTHON_REQUIREMENTS} .
RUN pip install -r {PYTHON_REQUIREMENTS}
COPY . .
ENV PYTHONUNBUFFERED=1
ENV PORT={port}
EXPOSE {port}
CMD [\"python\", \"{entry}\"]
"
            ),
            Self::Php => format!(
                "FROM php:8.1-apache
WORKDIR /var/www/html
COPY . .
RUN sed -i 's/Listen 80$/Listen {port}/' /etc/apache2/ports.conf \\
 && sed -i 's/:80>/:{port}>/' /etc/apache2/sites-available/000-default.conf
EXPOSE {port}
CMD [\"apache2-foreground\"]
"
            ),
            Self::Static => format!(
                "FROM nginx:alpine
COPY . /usr/share/nginx/html
RUN sed -i 's/listen  *80;/listen {port};/' /etc/nginx/conf.d/default.conf
EXPOSE {port}
CMD [\"nginx\", \"-g\", \"daemon off;\"]
"
            ),
        }
    }
}
