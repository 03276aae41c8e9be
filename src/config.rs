//! 配置模块，负责加载 JSON 配置文件（编译器参数和实体 schema）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::schema::{AssociationSchema, EntitySchema, Schema, SchemaError};

/// 未指定分页 limit 时使用的默认值
pub const DEFAULT_LIMIT: u64 = 1000;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// 编译器参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// 分页请求未设置 limit（或为 0）时使用的 limit
    pub default_limit: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// 完整的应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// 实体名到实体 schema 的映射，加载时会进行校验
    pub schema: Schema,
}

impl AppConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound(display));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        // 解析JSON（schema 校验失败同样作为解析错误返回）
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// 创建演示配置（用于测试或fallback）
    pub fn demo() -> Result<Self, SchemaError> {
        let schema = Schema::from_entities([
            (
                "Item".to_string(),
                EntitySchema::new("items")
                    .field("id")
                    .field("name")
                    .field("age")
                    .field("created_at")
                    .column("deleted", "deleted_at")
                    .association("owner", AssociationSchema::new("Owner", ["id"], ["owner_id"])),
            ),
            (
                "Owner".to_string(),
                EntitySchema::new("owners").field("id").field("name").field("city"),
            ),
        ])?;

        Ok(Self {
            compiler: CompilerConfig::default(),
            schema,
        })
    }
}
