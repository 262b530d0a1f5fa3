//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// API Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ApiVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 提交校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 引用的目标不存在（外键约束）
    #[error("目标不存在: {0}")]
    UnknownTarget(String),

    /// URL 已被登记（唯一约束）
    #[error("该 URL 已被登记: {0}")]
    DuplicateUrl(String),

    /// 其他数据库错误
    #[error("数据库错误: {0}")]
    Database(String),
}

/// 提交校验错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 缺少必填字段
    #[error("缺少必填字段: {0}")]
    MissingField(&'static str),

    /// URL 格式无效
    #[error("URL 格式无效: {0}")]
    InvalidUrl(String),

    /// 评分不是数字
    #[error("评分必须是数字")]
    InvalidRating,

    /// 评分超出范围
    #[error("评分必须在 1 到 5 之间")]
    RatingOutOfRange,
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ApiVitalsError>;
