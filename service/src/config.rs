use alarm_ocr::OcrConfig;
use alarm_text::ReplaceDictionary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    // ============ 传真接入 ============
    pub fax: FaxConfig,

    // ============ OCR 引擎 ============
    pub ocr: OcrConfig,

    // ============ 文本规范化 ============
    pub replace_dictionary: ReplaceDictionary,

    // ============ 解析与派发 ============
    pub parser: ParserConfig,
    pub jobs: JobsConfig,
    pub sequence: SequenceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct FaxConfig {
    /// 传真输入目录
    pub fax_path: PathBuf,
    /// 归档目录
    pub archive_path: PathBuf,
    /// OCR 中间结果目录
    pub analysis_path: PathBuf,
    /// 只处理该扩展名的文件（不含点，忽略大小写）
    pub file_extension: String,
    /// 轮询间隔（毫秒）
    pub routine_interval_ms: u64,
    /// 移动失败时的重试次数
    pub move_retry_count: u32,
    /// 两次重试之间的等待（毫秒）
    pub move_retry_delay_ms: u64,
    /// 修改时间距今不足该值的文件留到下一轮（毫秒）
    pub settle_ms: u64,
    /// 识别后保留拆分出的页面图片
    pub keep_page_images: bool,
    /// 使用的解析器别名
    pub parser_alias: String,
    /// 包含任一关键字的传真视为测试传真
    pub test_fax_keywords: Vec<String>,
    /// 包含任一条目的传真被跳过
    pub fax_blacklist: Vec<String>,
    /// 非空时传真必须包含其中至少一条
    pub fax_whitelist: Vec<String>,
}

impl Default for FaxConfig {
    fn default() -> Self {
        Self {
            fax_path: PathBuf::from("fax/in"),
            archive_path: PathBuf::from("fax/archive"),
            analysis_path: PathBuf::from("fax/analysis"),
            file_extension: "tif".to_string(),
            routine_interval_ms: 2000,
            move_retry_count: 60,
            move_retry_delay_ms: 200,
            settle_ms: 500,
            keep_page_images: false,
            parser_alias: "GenericParser".to_string(),
            test_fax_keywords: Vec::new(),
            fax_blacklist: Vec::new(),
            fax_whitelist: Vec::new(),
        }
    }
}

impl FaxConfig {
    pub fn routine_interval(&self) -> Duration {
        Duration::from_millis(self.routine_interval_ms)
    }

    pub fn move_retry_delay(&self) -> Duration {
        Duration::from_millis(self.move_retry_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserConfig {
    /// 语法文件（JSON）
    pub control_file: PathBuf,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            control_file: PathBuf::from("control.json"),
        }
    }
}

/// 导出文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Template,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct FileExporterConfig {
    pub destination_path: PathBuf,
    pub format: ExportFormat,
    /// `{path}` 占位符模板，仅 `template` 格式使用
    pub template: String,
}

impl Default for FileExporterConfig {
    fn default() -> Self {
        Self {
            destination_path: PathBuf::from("operations"),
            format: ExportFormat::Json,
            template: "{timestamp} {keywords.keyword}\n{location.street} {location.streetnumber}, {location.zipcode} {location.city}\n{comment}\n".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct JobsConfig {
    /// 启用的任务别名，按顺序执行
    pub enabled: Vec<String>,
    pub file_exporter: FileExporterConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["OperationLogger".to_string()],
            file_exporter: FileExporterConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct SequenceConfig {
    /// 记录最后一个警情编号的文件
    pub state_file: PathBuf,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("sequence.txt"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 读取配置，文件不存在时返回默认配置
///
/// 相对路径以配置文件所在目录为基准。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)?
    } else {
        log::info!("[Config] {} 不存在，使用默认配置", path.display());
        AppConfig::default()
    };

    config.validate()?;
    config.resolve_paths(&config_dir(path)?);
    Ok(config)
}

/// 配置文件所在目录的绝对路径；裸文件名以当前工作目录为准
fn config_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.parent() {
        Some(dir) if dir.is_absolute() => Ok(dir.to_path_buf()),
        Some(dir) => Ok(std::env::current_dir()?.join(dir)),
        None => Ok(std::env::current_dir()?),
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

impl AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fax.file_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid("fax.fileExtension is empty".to_string()));
        }
        if self.fax.move_retry_count == 0 {
            return Err(ConfigError::Invalid(
                "fax.moveRetryCount must be at least 1".to_string(),
            ));
        }
        if self.fax.parser_alias.trim().is_empty() {
            return Err(ConfigError::Invalid("fax.parserAlias is empty".to_string()));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.fax.fax_path,
            &mut self.fax.archive_path,
            &mut self.fax.analysis_path,
            &mut self.parser.control_file,
            &mut self.jobs.file_exporter.destination_path,
            &mut self.sequence.state_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
