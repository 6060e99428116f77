#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CuratorView {
    pub enabled: bool,
    pub threshold: u8,
    pub post_limit: u32,
    pub auto_scroll: bool,
    pub hidden_count: usize,
    pub kept_count: usize,
    pub processed_count: usize,
    pub limit_reached: bool,
    pub collecting: bool,
    pub dirty: bool,
}
