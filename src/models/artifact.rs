/// 已下载的生成结果图片
///
/// 只有 `Complete` 状态的任务才会产生。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    /// 导出时使用的文件名，例如 `section_2_image_3.png`
    pub filename: String,
    /// CSV 中的说明文字
    pub caption: String,
    /// 图片来源 URL
    pub url: String,
    /// 产生该图片的提示词位置
    pub prompt_position: usize,
    pub bytes: Vec<u8>,
}

/// 已下载但尚未标注的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub url: String,
    pub bytes: Vec<u8>,
}
