//! The callable binding generated for one endpoint.
//!
//! # Design
//! An `Endpoint` owns its descriptor and compiles it on first use. The
//! compiled outcome, template or error, is stored in a `OnceLock`, so callers
//! racing on first use all observe the same `Arc<RequestTemplate>` and the
//! compiler runs at most once.
//!
//! `call` binds arguments eagerly, so a binding error fails the call before
//! anything reaches the transport. The returned stream is lazy: the request
//! is sent when the stream is first polled.

use std::sync::{Arc, OnceLock};

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;

use crate::config::CompileOptions;
use crate::descriptor::{EndpointDescriptor, ReturnShape};
use crate::error::{CallError, MalformedDescriptor};
use crate::http::{RequestDescription, ResponseDecoder, Transport};
use crate::instantiate::instantiate;
use crate::template::{compile_with, RequestTemplate};
use crate::value::ArgValue;

#[derive(Debug)]
pub struct Endpoint {
    descriptor: EndpointDescriptor,
    options: CompileOptions,
    template: OnceLock<Result<Arc<RequestTemplate>, MalformedDescriptor>>,
}

impl Endpoint {
    pub fn new(descriptor: EndpointDescriptor) -> Self {
        Self::with_options(descriptor, CompileOptions::default())
    }

    pub fn with_options(descriptor: EndpointDescriptor, options: CompileOptions) -> Self {
        Self {
            descriptor,
            options,
            template: OnceLock::new(),
        }
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    /// The compiled template, compiling it on first use.
    pub fn template(&self) -> Result<Arc<RequestTemplate>, MalformedDescriptor> {
        self.template
            .get_or_init(|| compile_with(&self.descriptor, &self.options).map(Arc::new))
            .clone()
    }

    /// Bind arguments without sending anything.
    pub fn request(&self, args: &[ArgValue]) -> Result<RequestDescription, CallError> {
        let template = self.template()?;
        Ok(instantiate(&template, args)?)
    }

    /// Bind `args`, then return a stream that executes the request on first
    /// poll and yields the decoded values for the endpoint's return shape.
    pub fn call<T, D>(
        &self,
        transport: Arc<dyn Transport>,
        decoder: D,
        args: &[ArgValue],
    ) -> Result<BoxStream<'static, Result<T, CallError>>, CallError>
    where
        T: DeserializeOwned + Send + 'static,
        D: ResponseDecoder,
    {
        let template = self.template()?;
        let request = instantiate(&template, args)?;
        let returns = template.returns();

        let items = stream::once(fetch::<T, D>(transport, decoder, request, returns))
            .flat_map(|outcome| {
                let items: Vec<Result<T, CallError>> = match outcome {
                    Ok(values) => values.into_iter().map(Ok).collect(),
                    Err(err) => vec![Err(err)],
                };
                stream::iter(items)
            })
            .boxed();
        Ok(items)
    }
}

async fn fetch<T, D>(
    transport: Arc<dyn Transport>,
    decoder: D,
    request: RequestDescription,
    returns: ReturnShape,
) -> Result<Vec<T>, CallError>
where
    T: DeserializeOwned,
    D: ResponseDecoder,
{
    let response = transport.execute(request).await?;
    if !response.is_success() {
        return Err(CallError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    match returns {
        ReturnShape::Unit => Ok(Vec::new()),
        ReturnShape::Single => Ok(vec![decoder.decode::<T>(&response.body)?]),
        ReturnShape::Stream | ReturnShape::StreamOfContainers => {
            Ok(decoder.decode::<Vec<T>>(&response.body)?)
        }
    }
}
