pub mod classifier;
pub mod executor;
pub mod layout;
pub mod resolver;
pub mod session;
pub mod transport;

pub use classifier::{classify, ClassifierConfig};
pub use executor::Executor;
pub use layout::ApiLayout;
pub use resolver::{expand_template, EndpointResolver, ResolvedEndpoint};
pub use session::{CredentialGuard, SessionCredential};
pub use transport::{HttpTransport, ProbeRequest, RawResult, ResponseBody, Transport};
