// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ROBOTS.TXT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Parser das regras clássicas de exclusão:
// - grupos por `User-agent` (match case-insensitive por substring do product token)
// - grupo `*` como padrão
// - primeira regra `Allow`/`Disallow` cujo prefixo casa vence
// - `Disallow:` vazio libera tudo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::Duration;

use async_trait::async_trait;

use super::http::HttpError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RobotsRule {
    allow: bool,
    path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RobotsGroup {
    agents: Vec<String>,
    rules: Vec<RobotsRule>,
}

impl RobotsGroup {
    fn applies_to(&self, product: &str) -> bool {
        self.agents
            .iter()
            .any(|agent| agent != "*" && product.contains(agent.as_str()))
    }

    fn allowed(&self, path: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| path.starts_with(&rule.path))
            .map(|rule| rule.allow)
            .unwrap_or(true)
    }
}

/// Política de robots.txt já interpretada para uma origem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsPolicy {
    mode: PolicyMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PolicyMode {
    AllowAll,
    DisallowAll,
    Rules(Vec<RobotsGroup>),
}

impl RobotsPolicy {
    /// Tudo liberado (robots ausente)
    pub fn allow_all() -> Self {
        Self {
            mode: PolicyMode::AllowAll,
        }
    }

    /// Tudo bloqueado (robots protegido por 401/403)
    pub fn disallow_all() -> Self {
        Self {
            mode: PolicyMode::DisallowAll,
        }
    }

    /// Faz parse do conteúdo de um robots.txt
    pub fn parse(text: &str) -> Self {
        let mut groups: Vec<RobotsGroup> = Vec::new();
        let mut current = RobotsGroup::default();
        let mut collecting_agents = false;

        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !collecting_agents && !current.agents.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(product_token(value));
                    collecting_agents = true;
                }
                "allow" | "disallow" if !current.agents.is_empty() => {
                    collecting_agents = false;
                    let allow = key == "allow";
                    if !allow && value.is_empty() {
                        // `Disallow:` vazio = tudo liberado
                        current.rules.push(RobotsRule {
                            allow: true,
                            path: String::new(),
                        });
                    } else if !value.is_empty() {
                        current.rules.push(RobotsRule {
                            allow,
                            path: value.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        Self {
            mode: PolicyMode::Rules(groups),
        }
    }

    /// Converte a resposta HTTP do robots.txt em política.
    ///
    /// 401/403 bloqueiam tudo, outros 4xx liberam tudo, 5xx são erro
    /// (o fetcher trata erro como liberado).
    pub fn from_response(status: u16, body: &str) -> Result<Self, HttpError> {
        match status {
            200..=299 => Ok(Self::parse(body)),
            401 | 403 => Ok(Self::disallow_all()),
            400..=499 => Ok(Self::allow_all()),
            _ => Err(HttpError::Status(status)),
        }
    }

    /// Verifica se `user_agent` pode acessar `path` (path + query).
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let groups = match &self.mode {
            PolicyMode::AllowAll => return true,
            PolicyMode::DisallowAll => return false,
            PolicyMode::Rules(groups) => groups,
        };

        let product = product_token(user_agent);
        let path = if path.is_empty() { "/" } else { path };

        if let Some(group) = groups.iter().find(|g| g.applies_to(&product)) {
            return group.allowed(path);
        }
        groups
            .iter()
            .find(|g| g.agents.iter().any(|a| a == "*"))
            .map(|g| g.allowed(path))
            .unwrap_or(true)
    }
}

/// `Mozilla/5.0 (X11; ...)` → `mozilla`
fn product_token(user_agent: &str) -> String {
    user_agent
        .split('/')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Fonte de políticas de robots.txt
#[async_trait]
pub trait RobotsSource: Send + Sync {
    /// Busca e interpreta o robots.txt em `robots_url`
    async fn get_robots(
        &self,
        robots_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<RobotsPolicy, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

    #[test]
    fn test_default_group_applies() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private\n");
        assert!(policy.is_allowed(BROWSER_UA, "/public/page"));
        assert!(!policy.is_allowed(BROWSER_UA, "/private/data"));
    }

    #[test]
    fn test_specific_agent_overrides_default() {
        let text = "\
User-agent: *
Disallow: /

User-agent: Mozilla
Disallow: /admin
";
        let policy = RobotsPolicy::parse(text);
        assert!(policy.is_allowed(BROWSER_UA, "/articles/1"));
        assert!(!policy.is_allowed(BROWSER_UA, "/admin/panel"));
        assert!(!policy.is_allowed("curl/8.0", "/articles/1"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let text = "User-agent: *\nAllow: /docs/public\nDisallow: /docs\n";
        let policy = RobotsPolicy::parse(text);
        assert!(policy.is_allowed(BROWSER_UA, "/docs/public/intro"));
        assert!(!policy.is_allowed(BROWSER_UA, "/docs/internal"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow:\n");
        assert!(policy.is_allowed(BROWSER_UA, "/anything"));
    }

    #[test]
    fn test_grouped_agents_and_comments() {
        let text = "# comentário\nUser-agent: googlebot\nUser-agent: mozilla # navegadores\nDisallow: /x\n";
        let policy = RobotsPolicy::parse(text);
        assert!(!policy.is_allowed(BROWSER_UA, "/x/y"));
        assert!(policy.is_allowed(BROWSER_UA, "/"));
    }

    #[test]
    fn test_from_response_status_mapping() {
        assert_eq!(RobotsPolicy::from_response(403, ""), Ok(RobotsPolicy::disallow_all()));
        assert_eq!(RobotsPolicy::from_response(401, ""), Ok(RobotsPolicy::disallow_all()));
        assert_eq!(RobotsPolicy::from_response(404, ""), Ok(RobotsPolicy::allow_all()));
        assert_eq!(
            RobotsPolicy::from_response(503, ""),
            Err(HttpError::Status(503))
        );
        assert!(!RobotsPolicy::disallow_all().is_allowed(BROWSER_UA, "/"));
    }

    #[test]
    fn test_no_rules_allows() {
        let policy = RobotsPolicy::parse("");
        assert!(policy.is_allowed(BROWSER_UA, "/"));
    }
}
