//! Job trait - 型付きペイロードの定義
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Job は queue に流すペイロード型
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendMail {
///     to: String,
/// }
///
/// impl Job for SendMail {
///     const NAME: &'static str = "send_mail";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: `Queue::add` で envelope に書くため
/// - `DeserializeOwned`: envelope の payload から復元するため
/// - `Send + Sync + 'static`: worker タスクをまたいで渡すため
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// ログに出す名前。queue 上のファイルには書かれない
    const NAME: &'static str;
}
