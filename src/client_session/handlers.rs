//! Default message-table handlers (§4.5.4): `user-join`, `user-rejoin`, `user-leave`,
//! `request-failed`, `session-close`.

//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Whether an inbound join/rejoin frame carries a `seq` decides local-vs-remote flags: a `seq` means the
/// frame is the reply to *our own* request.
fn flags_from_seq(xml: &XmlNode) -> Result<UserFlags, Error>
{
    match xml.attr_u32("seq")
    {
        Ok(Some(_)) => Ok(UserFlags::Local),
        Ok(None) => Ok(UserFlags::None),
        Err(()) => Err(RequestError::NoSuchAttribute.into()),
    }
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn handle_user_join(session: &ClientSession, _conn: &dyn Connection, xml: &XmlNode) -> Result<(), Error>
{
    let mut props = session.base_extract_user_props(xml);
    let flags = flags_from_seq(xml)?;
    props.insert("flags".to_string(), PropertyValue::Flags(flags));

    let user = session.base_add_user(props)?;

    if let Some(request) = session.get_by_xml(Some("user-join"), xml)?
    {
        request.finish(Some(user), None);
        session.request_manager_remove(&request);
    }

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn handle_user_rejoin(session: &ClientSession, _conn: &dyn Connection, xml: &XmlNode) -> Result<(), Error>
{
    let mut props = session.base_extract_user_props(xml);
    let id = match props.get("id")
    {
        Some(PropertyValue::UInt(id)) => *id,
        _ => return Err(UserJoinError::NoSuchUser.into()),
    };

    let existing = session.lookup_user(id).ok_or(UserJoinError::NoSuchUser)?;
    session.base_validate_user_props(&props, &existing)?;

    let flags = flags_from_seq(xml)?;
    props.insert("flags".to_string(), PropertyValue::Flags(flags));

    let user = session.base_apply_user_props(id, &props).ok_or(UserJoinError::NoSuchUser)?;

    if let Some(request) = session.get_by_xml(Some("user-rejoin"), xml)?
    {
        request.finish(Some(user), None);
        session.request_manager_remove(&request);
    }

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn handle_user_leave(session: &ClientSession, _conn: &dyn Connection, xml: &XmlNode) -> Result<(), Error>
{
    let id = match xml.attr_u32("id")
    {
        Ok(Some(id)) => id,
        Ok(None) => return Err(UserLeaveError::IdNotPresent.into()),
        Err(()) => return Err(UserLeaveError::IdNotPresent.into()),
    };

    let user = session.base_set_user_unavailable(id).ok_or(UserLeaveError::NoSuchUser)?;

    if let Some(request) = session.get_by_xml(Some("user-leave"), xml)?
    {
        request.finish(Some(user), None);
        session.request_manager_remove(&request);
    }

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn handle_request_failed(session: &ClientSession, _conn: &dyn Connection, xml: &XmlNode) -> Result<(), Error>
{
    let code = xml.attr_u32("code").map_err(|()| RequestError::NoSuchAttribute)?
        .ok_or(RequestError::NoSuchAttribute)?;
    let domain = xml.attr("domain").ok_or(RequestError::NoSuchAttribute)?;

    let request = session.get_by_xml_required(None, xml)?;
    let error = session.translate_error(domain, code);
    session.request_manager_fail(&request, error);

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------

pub(crate) fn handle_session_close(session: &ClientSession, _conn: &dyn Connection, _xml: &XmlNode) -> Result<(), Error>
{
    session.release_connection_after_session_close();
    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------
