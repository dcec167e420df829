//! Transactional email templates, one per auth action.

use std::{fmt, str::FromStr};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailActionType {
    Signup,
    Recovery,
    Magiclink,
    EmailChange,
    Invite,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported email action type: {0}")]
pub struct UnknownActionType(pub String);

impl FromStr for EmailActionType {
    type Err = UnknownActionType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signup" => Ok(Self::Signup),
            "recovery" => Ok(Self::Recovery),
            "magiclink" => Ok(Self::Magiclink),
            "email_change" => Ok(Self::EmailChange),
            "invite" => Ok(Self::Invite),
            other => Err(UnknownActionType(other.to_string())),
        }
    }
}

impl EmailActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Recovery => "recovery",
            Self::Magiclink => "magiclink",
            Self::EmailChange => "email_change",
            Self::Invite => "invite",
        }
    }

    fn copy(self) -> TemplateCopy {
        match self {
            Self::Signup => TemplateCopy {
                subject: "Confirmez votre inscription",
                heading: "Bienvenue sur Patrimoine",
                intro: "Merci pour votre inscription. Confirmez votre adresse email pour commencer à suivre votre budget et votre patrimoine.",
                action: "Confirmer mon adresse",
            },
            Self::Recovery => TemplateCopy {
                subject: "Réinitialisez votre mot de passe",
                heading: "Réinitialisation du mot de passe",
                intro: "Vous avez demandé à réinitialiser votre mot de passe. Ce lien est valable pendant une durée limitée.",
                action: "Choisir un nouveau mot de passe",
            },
            Self::Magiclink => TemplateCopy {
                subject: "Votre lien de connexion",
                heading: "Connexion à Patrimoine",
                intro: "Utilisez le lien ci-dessous pour vous connecter sans mot de passe.",
                action: "Me connecter",
            },
            Self::EmailChange => TemplateCopy {
                subject: "Confirmez votre nouvelle adresse email",
                heading: "Changement d'adresse email",
                intro: "Confirmez cette adresse pour l'associer à votre compte Patrimoine.",
                action: "Confirmer le changement",
            },
            Self::Invite => TemplateCopy {
                subject: "Vous avez été invité sur Patrimoine",
                heading: "Invitation",
                intro: "Vous avez été invité à rejoindre Patrimoine. Acceptez l'invitation pour créer votre compte.",
                action: "Accepter l'invitation",
            },
        }
    }
}

impl fmt::Display for EmailActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TemplateCopy {
    subject: &'static str,
    heading: &'static str,
    intro: &'static str,
    action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Link verifying `token_hash` on the auth API, then landing on `redirect_to`.
///
/// # Errors
/// Returns an error if `backend_url` is not an absolute URL.
pub fn confirmation_url(
    backend_url: &str,
    token_hash: &str,
    action: EmailActionType,
    redirect_to: &str,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&format!(
        "{}/auth/v1/verify",
        backend_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut()
        .append_pair("token", token_hash)
        .append_pair("type", action.as_str())
        .append_pair("redirect_to", redirect_to);
    Ok(url.into())
}

#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Fill the template of `action` with the confirmation link and one-time code.
#[must_use]
pub fn render(action: EmailActionType, confirmation_url: &str, code: &str) -> RenderedEmail {
    let copy = action.copy();
    let url = escape_html(confirmation_url);
    let code_html = escape_html(code);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="fr">
  <body style="font-family: Arial, sans-serif; color: #1f2933; background: #f5f7fa; padding: 24px;">
    <div style="max-width: 480px; margin: 0 auto; background: #ffffff; border-radius: 8px; padding: 32px;">
      <h1 style="font-size: 20px; margin-top: 0;">{heading}</h1>
      <p>{intro}</p>
      <p style="text-align: center; margin: 32px 0;">
        <a href="{url}" style="background: #0f766e; color: #ffffff; padding: 12px 20px; border-radius: 6px; text-decoration: none;">{action}</a>
      </p>
      <p>Ou saisissez ce code : <strong>{code_html}</strong></p>
      <p style="font-size: 12px; color: #7b8794;">Si vous n'êtes pas à l'origine de cette demande, ignorez cet email.</p>
    </div>
  </body>
</html>
"#,
        heading = copy.heading,
        intro = copy.intro,
        action = copy.action,
    );

    let text = format!(
        "{heading}\n\n{intro}\n\n{action} : {confirmation_url}\n\nCode : {code}\n\nSi vous n'êtes pas à l'origine de cette demande, ignorez cet email.\n",
        heading = copy.heading,
        intro = copy.intro,
        action = copy.action,
    );

    RenderedEmail {
        subject: copy.subject.to_string(),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn parses_known_action_types() {
        for action in ["signup", "recovery", "magiclink", "email_change", "invite"] {
            let parsed: Result<EmailActionType, _> = action.parse();
            assert_eq!(parsed.map(EmailActionType::as_str), Ok(action));
        }
        assert_eq!(
            "reauthentication".parse::<EmailActionType>(),
            Err(UnknownActionType("reauthentication".to_string()))
        );
    }

    #[test]
    fn confirmation_url_targets_verify_endpoint() -> Result<()> {
        let url = confirmation_url(
            "https://project.example/",
            "pkce_abc",
            EmailActionType::Recovery,
            "http://localhost:8080/auth/callback?next=/reset-password",
        )?;
        assert_eq!(
            url,
            "https://project.example/auth/v1/verify?token=pkce_abc&type=recovery&redirect_to=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fcallback%3Fnext%3D%2Freset-password"
        );
        Ok(())
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn render_substitutes_escaped_link_and_code() {
        let email = render(
            EmailActionType::Signup,
            "https://project.example/auth/v1/verify?token=t&type=signup",
            "123456",
        );
        assert_eq!(email.subject, "Confirmez votre inscription");
        assert!(email.html.contains(
            r#"href="https://project.example/auth/v1/verify?token=t&amp;type=signup""#
        ));
        assert!(email.html.contains("<strong>123456</strong>"));
        assert!(email.text.contains("https://project.example/auth/v1/verify?token=t&type=signup"));
        assert!(email.text.contains("Code : 123456"));
    }

    #[test]
    fn each_action_has_its_own_subject() {
        let subjects: Vec<String> = [
            EmailActionType::Signup,
            EmailActionType::Recovery,
            EmailActionType::Magiclink,
            EmailActionType::EmailChange,
            EmailActionType::Invite,
        ]
        .into_iter()
        .map(|action| render(action, "https://x.example", "1").subject)
        .collect();
        let mut unique = subjects.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), subjects.len());
    }
}
