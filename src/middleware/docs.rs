//! The documentation page: a static Redoc shell pointed at the served OpenAPI document.

use minijinja::{context, Environment, Value};

const DOCS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>{{ title }}</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
    <style>
      body {
        margin: 0;
        padding: 0;
      }
    </style>
  </head>
  <body>
    <redoc spec-url="{{ spec_url }}"></redoc>
    <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
  </body>
</html>
"#;

/// Render the page once; the result is served unchanged afterwards.
pub(crate) fn render_docs_page(title: &str, spec_url: &str) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("docs.html", DOCS_TEMPLATE)?;
    let tmpl = env.get_template("docs.html")?;
    tmpl.render(context! { title => title, spec_url => attribute_url(spec_url) })
}

/// Plain URLs go in as written; anything that could leave the attribute is escaped.
fn attribute_url(url: &str) -> Value {
    if url.contains(['"', '\'', '<', '>', '&']) {
        Value::from(url)
    } else {
        Value::from_safe_string(url.to_string())
    }
}
