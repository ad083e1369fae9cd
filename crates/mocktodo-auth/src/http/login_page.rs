//! HTML login prompt of the authorize endpoint.

use crate::oidc::provider::LoginPrompt;

const STYLES: &str = r#"
body { font-family: system-ui, sans-serif; background: #f4f5f7; margin: 0; }
.container { max-width: 360px; margin: 10vh auto; }
.card { background: #fff; border-radius: 8px; padding: 2rem; box-shadow: 0 1px 4px rgba(0,0,0,.1); }
.card-title { font-size: 1.25rem; font-weight: 600; margin-bottom: 1rem; }
.form-group { margin-bottom: 1rem; }
.form-label { display: block; font-size: .875rem; margin-bottom: .25rem; }
.form-input { width: 100%; box-sizing: border-box; padding: .5rem; border: 1px solid #ccd; border-radius: 4px; }
.btn { width: 100%; padding: .6rem; border: 0; border-radius: 4px; background: #2f6fed; color: #fff; font-weight: 600; cursor: pointer; }
.alert-error { background: #fdecea; color: #8a1c12; padding: .5rem .75rem; border-radius: 4px; margin-bottom: 1rem; }
.hint { font-size: .75rem; color: #667; margin-top: 1rem; }
"#;

/// Base HTML template wrapper.
fn html_page(title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + 1500);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>");
    html.push_str(&html_escape(title));
    html.push_str(" - mocktodo</title>\n");
    html.push_str("    <style>");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n    <div class=\"container\">\n");
    html.push_str(content);
    html.push_str("\n    </div>\n</body>\n</html>");
    html
}

fn hidden_field(content: &mut String, name: &str, value: &str) {
    content.push_str("<input type=\"hidden\" name=\"");
    content.push_str(name);
    content.push_str("\" value=\"");
    content.push_str(&html_escape(value));
    content.push_str("\">\n");
}

/// Renders the login form. It posts back to `/auth/authorize` with the
/// authorization parameters as hidden fields.
#[must_use]
pub fn render_login_form(prompt: &LoginPrompt) -> String {
    let mut content = String::with_capacity(2048);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">Sign in to ");
    content.push_str(&html_escape(&prompt.client_id));
    content.push_str("</div>\n\n");

    if let Some(e) = &prompt.error {
        content.push_str("<div class=\"alert-error\">");
        content.push_str(&html_escape(e));
        content.push_str("</div>\n\n");
    }

    content.push_str("<form method=\"POST\" action=\"/auth/authorize\">\n");
    hidden_field(&mut content, "client_id", &prompt.client_id);
    hidden_field(&mut content, "redirect_uri", &prompt.redirect_uri);
    hidden_field(&mut content, "response_type", &prompt.response_type);
    hidden_field(&mut content, "scope", &prompt.scope);
    hidden_field(&mut content, "state", &prompt.state);
    content.push('\n');

    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"username\">Username</label>\n");
    content
        .push_str("<input type=\"text\" id=\"username\" name=\"username\" class=\"form-input\" ");
    content.push_str("required autocomplete=\"username\">\n");
    content.push_str("</div>\n\n");

    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"password\">Password</label>\n");
    content.push_str(
        "<input type=\"password\" id=\"password\" name=\"password\" class=\"form-input\" ",
    );
    content.push_str("required autocomplete=\"current-password\">\n");
    content.push_str("</div>\n\n");

    content.push_str("<button type=\"submit\" class=\"btn\">Sign in</button>\n");
    content.push_str("</form>\n\n");

    content.push_str("<div class=\"hint\">Requested scopes: ");
    content.push_str(&html_escape(&prompt.scope));
    content.push_str("</div>\n");
    content.push_str("</div>");

    html_page("Sign In", &content)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(error: Option<&str>) -> LoginPrompt {
        LoginPrompt {
            client_id: "demo-client".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            response_type: "code".to_string(),
            scope: "openid profile".to_string(),
            state: "abc".to_string(),
            error: error.map(ToString::to_string),
        }
    }

    #[test]
    fn test_render_login_form() {
        let html = render_login_form(&prompt(None));
        assert!(html.contains("action=\"/auth/authorize\""));
        assert!(html.contains("name=\"redirect_uri\" value=\"http://localhost:3000/callback\""));
        assert!(html.contains("name=\"scope\" value=\"openid profile\""));
        assert!(html.contains("name=\"state\" value=\"abc\""));
        assert!(!html.contains("alert-error\">"));
    }

    #[test]
    fn test_render_login_form_with_error() {
        let html = render_login_form(&prompt(Some("Invalid username or password")));
        assert!(html.contains("Invalid username or password"));
    }

    #[test]
    fn test_values_are_escaped() {
        let mut p = prompt(None);
        p.state = "\"><script>alert(1)</script>".to_string();
        let html = render_login_form(&p);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a&b<c>'d'"), "a&amp;b&lt;c&gt;&#39;d&#39;");
    }
}
