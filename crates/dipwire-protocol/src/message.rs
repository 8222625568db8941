//! The top-level [`Message`] sum type.

use crate::{MessageKind, MessageName, Notification, Request, Response};

/// Any document that can travel on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

impl Message {
    pub fn name(&self) -> MessageName {
        match self {
            Self::Request(request) => request.name(),
            Self::Response(response) => response.name(),
            Self::Notification(notification) => notification.name(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.name().kind()
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}
