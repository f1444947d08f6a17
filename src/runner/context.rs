use crate::data::{DataResolver, DataValue, TestData};
use crate::parser::types::FileHeader;
use crate::utils::config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runtime state of one scenario.
///
/// Every scenario gets its own context and therefore its own [`TestData`];
/// values stored by one scenario are never visible to another. Header env
/// entries and data-driven rows are copied in as the starting contents.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Values stored by steps during this scenario
    pub data: TestData,
    pub resolver: DataResolver,
    pub config: Arc<Config>,

    /// Base directory of the scenario file (for resolving relative paths)
    pub base_dir: PathBuf,
    /// Output directory for reports
    pub output_dir: PathBuf,

    /// Prefix for relative page paths
    pub base_url: Option<String>,
    /// Device serial for mobile steps
    pub device: Option<String>,
    pub env: HashMap<String, String>,
    pub default_wait_secs: u64,
    pub scenario_name: String,

    seed: TestData,
}

impl ScenarioContext {
    pub fn new(
        config: Arc<Config>,
        base_dir: &Path,
        output_dir: Option<&Path>,
        device: Option<String>,
    ) -> Self {
        let mut output = output_dir
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base_dir.join("output"));

        if let Some(ref id) = device {
            output.push(id.replace(':', "_"));
        }

        let resolver = DataResolver {
            password_length: config.data.password_length,
            alpha_length: config.data.alpha_length,
            numeric_length: config.data.numeric_length,
        };

        Self {
            data: TestData::new(),
            resolver,
            base_dir: base_dir.to_path_buf(),
            output_dir: output,
            base_url: config.web.base_url.clone(),
            device,
            env: HashMap::new(),
            default_wait_secs: config.default_wait_secs,
            scenario_name: String::new(),
            seed: TestData::new(),
            config,
        }
    }

    /// Apply a file header: url, device, wait and env entries
    pub fn update_from_header(&mut self, header: &FileHeader) {
        if let Some(ref url) = header.url {
            self.base_url = Some(url.clone());
        }
        if let Some(ref device) = header.device {
            self.device = Some(device.clone());
        }
        if let Some(wait) = header.default_wait_secs {
            self.default_wait_secs = wait;
        }
        for (k, v) in &header.env {
            self.env.insert(k.clone(), v.clone());
            self.seed.set_field(k.clone(), v.as_str());
        }
    }

    /// Add starting values for every scenario created from this context
    pub fn seed<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (String, DataValue)>,
    {
        self.seed.extend(values);
    }

    /// A context for the next scenario, holding only the seeded values
    pub fn for_scenario(&self, name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.data = self.seed.clone();
        ctx.scenario_name = name.to_string();
        ctx
    }

    /// Resolve a symbolic token against this scenario's data
    pub fn resolve(&mut self, token: &str) -> String {
        self.resolver.resolve(token, &mut self.data)
    }

    /// Join a relative page path onto the base URL
    pub fn page_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match self.base_url {
            Some(ref base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Resolve a relative path to an absolute path
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ScenarioContext {
        ScenarioContext::new(Arc::new(Config::default()), Path::new("/suite"), None, None)
    }

    #[test]
    fn test_scenarios_do_not_share_data() {
        let mut file_ctx = context();
        file_ctx.seed([("region".to_string(), DataValue::from("EU"))]);

        let mut first = file_ctx.for_scenario("first");
        first.data.set_field("order", "123");

        let second = file_ctx.for_scenario("second");
        assert!(second.data.get_field("order").is_none());
        assert_eq!(second.data.get_field("region").map(|v| v.to_string()), Some("EU".to_string()));
        assert_eq!(second.scenario_name, "second");
    }

    #[test]
    fn test_header_env_becomes_data() {
        let mut ctx = context();
        let header = FileHeader {
            url: Some("https://g2.example.com/".to_string()),
            env: HashMap::from([("USER".to_string(), "agent".to_string())]),
            ..Default::default()
        };
        ctx.update_from_header(&header);

        let mut scenario = ctx.for_scenario("s");
        assert_eq!(scenario.resolve("USER"), "agent");
        assert_eq!(scenario.resolve("Hi ${USER}"), "Hi agent");
        assert_eq!(scenario.page_url("/login"), "https://g2.example.com/login");
    }

    #[test]
    fn test_device_output_dir() {
        let ctx = ScenarioContext::new(
            Arc::new(Config::default()),
            Path::new("/suite"),
            Some(Path::new("/out")),
            Some("192.168.0.5:5555".to_string()),
        );
        assert_eq!(ctx.output_dir, PathBuf::from("/out/192.168.0.5_5555"));
        assert_eq!(ctx.resolve_path("data.csv"), PathBuf::from("/suite/data.csv"));
    }
}
